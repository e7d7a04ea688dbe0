//! Tower-aware, type-checked access to fault context and frames
//!
//! These functions accept any [`FaultRef`], whatever its concrete shape.
//! Writes go to the first fault in the tower (starting from the one given)
//! that can store them; reads search the tower in the same order.

use crate::fault::FaultRef;
use crate::info::ContextEntry;
use crate::recover::raise;
use crate::standard::{self, KEY_CONTEXT, NO_CONTEXT_STORE, NO_FRAME_STORE};
use crate::tower::descend;
use crate::Result;
use std::any::{type_name, Any};
use std::fmt;

/// Attach `value` under `key` to `fault` or the nearest fault it embeds that
/// can store context.
///
/// # Panics
///
/// Raises the nil receiver fault when `fault` is `None`, and a fatal fault
/// when nothing in the tower can store context.
pub fn add_context<V>(fault: Option<&FaultRef>, key: impl Into<String>, value: V)
where
    V: Any + Send + Sync + fmt::Debug,
{
    let Some(fault) = fault else {
        raise(standard::nil_receiver())
    };

    add_context_entry(fault, key.into(), ContextEntry::new(value));
}

/// Like [`add_context`] for a value that is already wrapped
pub fn add_context_entry(fault: &FaultRef, key: String, entry: ContextEntry) {
    for (depth, candidate) in descend(Some(fault)).enumerate() {
        if let Some(store) = candidate.as_context_mutable() {
            if depth > 0 {
                tracing::trace!(fault = %fault, holder = %candidate, key = %key, "context delegated to embedded fault");
            }
            store.add_context_entry(key, entry);
            return;
        }
    }

    tracing::error!(fault = %fault, key = %key, "no context store in tower of embeds");
    raise(NO_CONTEXT_STORE.instance().with_context(KEY_CONTEXT, key).into_ref())
}

/// Record a call site on `fault` or the nearest fault it embeds that can
/// store frames.
///
/// # Panics
///
/// Same conditions as [`add_context`].
pub fn append_frame(fault: Option<&FaultRef>, frame: impl Into<String>) {
    let Some(fault) = fault else {
        raise(standard::nil_receiver())
    };
    let frame = frame.into();

    for (depth, candidate) in descend(Some(fault)).enumerate() {
        if let Some(store) = candidate.as_frame_appendable() {
            if depth > 0 {
                tracing::trace!(fault = %fault, holder = %candidate, frame = %frame, "frame delegated to embedded fault");
            }
            store.append_frame(frame);
            return;
        }
    }

    tracing::error!(fault = %fault, frame = %frame, "no frame store in tower of embeds");
    raise(NO_FRAME_STORE.instance().with_context("Frame", frame).into_ref())
}

/// Append `frame` and hand the same fault back, for propagating with `?`
/// or `return Err(..)`.
pub fn throw(fault: FaultRef, frame: impl Into<String>) -> FaultRef {
    append_frame(Some(&fault), frame);
    fault
}

/// Untyped lookup of `key`, searching `fault` and then everything it embeds.
///
/// The walk stops at the first fault holding `key`.
pub fn get_value(fault: Option<&FaultRef>, key: &str) -> Option<ContextEntry> {
    descend(fault).find_map(|f| f.as_context_mutable().and_then(|store| store.context_entry(key)))
}

/// Typed lookup of `key`, searching `fault` and then everything it embeds.
///
/// Fails with a `no such key` fault when the key is nowhere in the tower (or
/// `fault` is `None`), and with a `wrong key` fault when the stored value is
/// not a `T`. Neither case panics.
pub fn get_typed<T>(fault: Option<&FaultRef>, key: &str) -> Result<T>
where
    T: Any + Clone,
{
    let entry = get_value(fault, key).ok_or_else(|| standard::no_such_key(key))?;

    entry
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| standard::wrong_key(key, type_name::<T>(), entry.type_name()))
}

/// Annotate the fault on the error path of a [`Result`]
pub trait ResultExt<T> {
    /// Append a frame to the fault, if any
    fn frame(self, frame: impl Into<String>) -> Result<T>;

    /// Attach context to the fault, if any
    fn context<V>(self, key: impl Into<String>, value: V) -> Result<T>
    where
        V: Any + Send + Sync + fmt::Debug;
}

impl<T> ResultExt<T> for Result<T> {
    fn frame(self, frame: impl Into<String>) -> Result<T> {
        self.map_err(|fault| throw(fault, frame))
    }

    fn context<V>(self, key: impl Into<String>, value: V) -> Result<T>
    where
        V: Any + Send + Sync + fmt::Debug,
    {
        self.map_err(|fault| {
            add_context(Some(&fault), key, value);
            fault
        })
    }
}
