//! The recovery boundary: turning panics into faults
//!
//! This is the one place where unwinding is intercepted. Everywhere else
//! faults travel as ordinary `Err` values.

use crate::code::StdCode;
use crate::fault::{BareFault, BaseFault, Fault, FaultRef};
use crate::info::ContextEntry;
use crate::standard::{self, from_error, from_string};
use crate::Result;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

/// Abandon the current computation with `fault` as the panic payload.
///
/// The nearest [`recover`] or [`catch`] returns `fault` itself.
pub fn raise(fault: FaultRef) -> ! {
    panic::panic_any(fault)
}

/// A panic payload of a type the boundary does not know how to render.
///
/// Stored under [`standard::PANIC_VALUE_KEY`] so the original value can still
/// be inspected.
#[derive(Clone)]
pub struct PanicPayload(Arc<Mutex<Box<dyn Any + Send>>>);

impl PanicPayload {
    /// Copy the payload out if it is a `T`
    pub fn downcast<T: Any + Clone>(&self) -> Option<T> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .downcast_ref::<T>()
            .cloned()
    }

    /// Check whether the payload is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is::<T>()
    }
}

impl fmt::Debug for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<opaque panic payload>")
    }
}

// Primitive payloads are stored as themselves so typed lookups work.
macro_rules! try_primitives {
    ($payload:ident: $($ty:ty),+ $(,)?) => {
        $(
            let $payload = match $payload.downcast::<$ty>() {
                Ok(value) => return ContextEntry::new(*value),
                Err(other) => other,
            };
        )+
    };
}

fn payload_entry(payload: Box<dyn Any + Send>) -> ContextEntry {
    try_primitives!(payload:
        i8, i16, i32, i64, i128, isize,
        u8, u16, u32, u64, u128, usize,
        f32, f64, bool, char,
    );

    ContextEntry::new(PanicPayload(Arc::new(Mutex::new(payload))))
}

// Faults raised without going through `raise` still pass through intact.
fn fault_payload(
    payload: Box<dyn Any + Send>,
) -> std::result::Result<FaultRef, Box<dyn Any + Send>> {
    let payload = match payload.downcast::<FaultRef>() {
        Ok(fault) => return Ok(*fault),
        Err(other) => other,
    };
    let payload = match payload.downcast::<Box<dyn Fault>>() {
        Ok(fault) => return Ok(FaultRef::from(*fault)),
        Err(other) => other,
    };
    let payload = match payload.downcast::<Arc<BaseFault<StdCode>>>() {
        Ok(fault) => return Ok(*fault),
        Err(other) => other,
    };
    let payload = match payload.downcast::<Arc<BareFault<StdCode>>>() {
        Ok(fault) => return Ok(*fault),
        Err(other) => other,
    };
    let payload = match payload.downcast::<BaseFault<StdCode>>() {
        Ok(fault) => return Ok((*fault).into_ref()),
        Err(other) => other,
    };
    match payload.downcast::<BareFault<StdCode>>() {
        Ok(fault) => Ok((*fault).into_ref()),
        Err(other) => Err(other),
    }
}

fn message_fault(message: String) -> FaultRef {
    match from_string(&message) {
        Some(fault) => fault,
        None => standard::panic_fault(ContextEntry::new(message)),
    }
}

/// Normalize a caught panic payload into a fault.
///
/// - a [`FaultRef`] is returned unchanged; so is a `Box<dyn Fault>` or a
///   [`BaseFault`]/[`BareFault`] over [`StdCode`], by value or in an `Arc`
/// - a `String` or `&'static str` becomes an [`StdCode::Unknown`] fault
///   with that message (an empty message is treated as an opaque payload)
/// - `anyhow::Error`, `std::io::Error` and boxed `dyn Error` become
///   [`StdCode::Unknown`] faults carrying the error's message
/// - anything else becomes a [`standard::PANIC`] fault with the payload
///   under [`standard::PANIC_VALUE_KEY`]
pub fn from_panic_payload(payload: Box<dyn Any + Send>) -> FaultRef {
    let payload = match fault_payload(payload) {
        Ok(fault) => return fault,
        Err(other) => other,
    };
    let payload = match payload.downcast::<String>() {
        Ok(message) => return message_fault(*message),
        Err(other) => other,
    };
    let payload = match payload.downcast::<&'static str>() {
        Ok(message) => return message_fault((*message).to_string()),
        Err(other) => other,
    };
    let payload = match payload.downcast::<anyhow::Error>() {
        Ok(err) => return from_error(*err),
        Err(other) => other,
    };
    let payload = match payload.downcast::<std::io::Error>() {
        Ok(err) => return from_error(*err),
        Err(other) => other,
    };
    let payload = match payload.downcast::<Box<dyn std::error::Error + Send + Sync>>() {
        Ok(err) => return BaseFault::new(StdCode::Unknown, err.to_string()).into_ref(),
        Err(other) => other,
    };

    standard::panic_fault(payload_entry(payload))
}

fn recovered(payload: Box<dyn Any + Send>) -> FaultRef {
    let fault = from_panic_payload(payload);
    tracing::debug!(fault = %fault, "recovered panic");
    fault
}

/// Run `computation`, returning the fault it panicked with, if any.
///
/// An absent computation is not run and yields `None`.
///
/// The closure is treated as unwind safe: faults are designed to be annotated
/// through shared references, so state observed after a recovered panic is
/// whatever the computation left behind.
pub fn recover<F>(computation: Option<F>) -> Option<FaultRef>
where
    F: FnOnce(),
{
    let computation = computation?;
    catch(computation).err()
}

/// Run `computation`, converting a panic into `Err(fault)`
pub fn catch<T, F>(computation: F) -> Result<T>
where
    F: FnOnce() -> T,
{
    panic::catch_unwind(AssertUnwindSafe(computation)).map_err(recovered)
}

/// Poll `future` to completion, converting a panic raised while polling it
/// into `Err(fault)`. Panics are caught whatever suspension point they
/// follow.
#[cfg(feature = "async")]
pub async fn catch_future<Fut>(future: Fut) -> Result<Fut::Output>
where
    Fut: std::future::Future,
{
    use futures_util::FutureExt;

    AssertUnwindSafe(future).catch_unwind().await.map_err(recovered)
}

/// Async counterpart of [`recover`]
#[cfg(feature = "async")]
pub async fn recover_future<Fut>(future: Option<Fut>) -> Option<FaultRef>
where
    Fut: std::future::Future<Output = ()>,
{
    catch_future(future?).await.err()
}
