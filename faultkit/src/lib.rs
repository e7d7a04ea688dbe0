//! # faultkit
//!
//! Structured faults: a replacement for plain error values that carries a
//! classification code, a message, key/value context, a manually recorded
//! trace of frames, and an optional embedded cause.
//!
//! ## Design Philosophy
//!
//! - **Code**: Know what kind of fault occurred ([`StdCode`] or your own [`FaultCode`])
//! - **Context**: Typed key/value data attached by whoever handles the fault
//! - **Frames**: Call sites appended explicitly as the fault propagates
//! - **Embeds**: Wrap a cause without losing it; walk the [`tower`] to find it
//! - **Recovery**: One boundary ([`recover`], [`catch`]) turns panics into faults
//!
//! ## Usage
//!
//! ```rust
//! use faultkit::{context, BaseFault, ResultExt, StdCode};
//!
//! fn read_config(path: &str) -> faultkit::Result<String> {
//!     Err(BaseFault::new(StdCode::OperationFail, "config file missing")
//!         .with_context("path", path.to_string())
//!         .into_ref())
//! }
//!
//! fn start() -> faultkit::Result<()> {
//!     let _config = read_config("/etc/app.toml").frame("start")?;
//!     Ok(())
//! }
//!
//! let fault = start().unwrap_err();
//! assert_eq!(fault.to_string(), "(Operation Failed) config file missing");
//! assert_eq!(
//!     context::get_typed::<String>(Some(&fault), "path").unwrap(),
//!     "/etc/app.toml"
//! );
//!
//! let recovered = faultkit::recover(Some(|| panic!("boom"))).unwrap();
//! assert_eq!(recovered.to_string(), "(UNKNOWN) boom");
//! ```
//!
//! ## Principles
//!
//! - Faults are returned, never thrown, except through [`raise`] inside a
//!   recovery boundary
//! - A fault's code and message never change; its context and frames only grow
//! - Everyone holding a [`FaultRef`] annotates the same instance
//! - Fault values are not synchronized beyond their own store: hand them to
//!   other threads freely, but interleaved frames from several threads come out
//!   in lock order

mod code;
mod fault;
mod info;

pub mod context;
pub mod recover;
pub mod standard;
pub mod tower;

pub use code::{FaultCode, StdCode};
pub use context::{add_context, append_frame, get_typed, get_value, throw, ResultExt};
pub use fault::{
    BareFault, BaseFault, Blueprint, ClassificationComparable, ContextMutable, Fault, FaultRef,
    FrameAppendable, FALLBACK_MESSAGE,
};
pub use info::{ContextEntry, Info};
#[cfg(feature = "async")]
pub use recover::{catch_future, recover_future};
pub use recover::{catch, from_panic_payload, raise, recover, PanicPayload};
pub use standard::{from_error, from_optional_error, from_string};
pub use tower::{
    checked_tower, checked_tower_within, embeds, info_lines, innermost, is, same_instance,
    tower_of_embeds, walk, TowerError, Walk,
};

/// Result type alias using a shared fault
pub type Result<T> = std::result::Result<T, FaultRef>;
