//! Prebuilt faults the core raises or returns itself

use crate::code::StdCode;
use crate::fault::{BaseFault, Blueprint, FaultRef};
use crate::info::ContextEntry;

/// Context key holding a recovered panic payload
pub const PANIC_VALUE_KEY: &str = "Value";

/// Context key holding the key of a failed context lookup
pub const KEY_CONTEXT: &str = "Key";

/// Context key holding the type a lookup asked for
pub const EXPECTED_TYPE_KEY: &str = "Expected Type";

/// Context key holding the type a lookup found
pub const ACTUAL_TYPE_KEY: &str = "Actual Type";

/// Context key explaining a fatal invariant violation
pub const REASON_KEY: &str = "Reason";

/// A panic whose payload was neither a fault, a message nor an error
pub const PANIC: Blueprint<StdCode> = Blueprint::new(StdCode::FatalError, "a panic has occurred");

/// A context lookup found nothing anywhere in the tower
pub const NO_SUCH_KEY: Blueprint<StdCode> = Blueprint::new(StdCode::OperationFail, "no such key");

/// A context lookup found a value of another type
pub const WRONG_KEY: Blueprint<StdCode> = Blueprint::new(
    StdCode::OperationFail,
    "key refers to a value of a different type",
);

/// An operation that needs a fault was given none
pub const NIL_RECEIVER: Blueprint<StdCode> =
    Blueprint::new(StdCode::BadParameter, "receiver must not be nil");

/// A fault (transitively) embeds itself
pub const MALFORMED_TOWER: Blueprint<StdCode> =
    Blueprint::new(StdCode::FatalError, "malformed tower of embeds");

/// Nothing in the tower can hold context
pub const NO_CONTEXT_STORE: Blueprint<StdCode> = Blueprint::new(
    StdCode::FatalError,
    "no fault in the tower of embeds can store context",
);

/// Nothing in the tower can hold frames
pub const NO_FRAME_STORE: Blueprint<StdCode> = Blueprint::new(
    StdCode::FatalError,
    "no fault in the tower of embeds can store frames",
);

/// An operation was invoked through an absent fault
pub fn nil_receiver() -> FaultRef {
    NIL_RECEIVER.instance().into_ref()
}

/// A context lookup found nothing under `key`
pub fn no_such_key(key: &str) -> FaultRef {
    NO_SUCH_KEY
        .instance()
        .with_context(KEY_CONTEXT, key.to_string())
        .into_ref()
}

/// A context lookup found `key` holding a different type
pub fn wrong_key(key: &str, expected: &str, actual: &str) -> FaultRef {
    WRONG_KEY
        .instance()
        .with_context(KEY_CONTEXT, key.to_string())
        .with_context(EXPECTED_TYPE_KEY, expected.to_string())
        .with_context(ACTUAL_TYPE_KEY, actual.to_string())
        .into_ref()
}

/// A panic whose payload was neither a fault, a string nor an error
pub fn panic_fault(value: ContextEntry) -> FaultRef {
    let fault = PANIC.instance();
    fault.info().insert_entry(PANIC_VALUE_KEY.to_string(), value);
    fault.into_ref()
}

/// Wrap a bare string under [`StdCode::Unknown`]; `None` for an empty string
pub fn from_string(s: &str) -> Option<FaultRef> {
    if s.is_empty() {
        return None;
    }

    Some(BaseFault::new(StdCode::Unknown, s).into_ref())
}

/// Wrap a foreign error under [`StdCode::Unknown`].
///
/// The fault's message is the error's message; the error itself is kept as
/// the fault's `source()`.
pub fn from_error<E>(err: E) -> FaultRef
where
    E: Into<anyhow::Error>,
{
    let err = err.into();
    BaseFault::new(StdCode::Unknown, err.to_string())
        .set_source(err)
        .into_ref()
}

/// Like [`from_error`], passing an absent error through as `None`
pub fn from_optional_error<E>(err: Option<E>) -> Option<FaultRef>
where
    E: Into<anyhow::Error>,
{
    err.map(from_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::get_typed;
    use crate::tower::is;

    #[test]
    fn test_from_string() {
        assert!(from_string("").is_none());

        let fault = from_string("boom").unwrap();
        assert_eq!(fault.to_string(), "(UNKNOWN) boom");
    }

    #[test]
    fn test_from_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let fault = from_error(io_err);

        assert_eq!(fault.to_string(), "(UNKNOWN) access denied");
        assert!(std::error::Error::source(&*fault).is_some());

        assert!(from_optional_error(None::<std::io::Error>).is_none());
        assert!(from_optional_error(Some(anyhow::anyhow!("late"))).is_some());
    }

    #[test]
    fn test_no_such_key_carries_key() {
        let fault = no_such_key("user_id");
        assert_eq!(fault.to_string(), "(Operation Failed) no such key");
        assert_eq!(get_typed::<String>(Some(&fault), KEY_CONTEXT).unwrap(), "user_id");
    }

    #[test]
    fn test_wrong_key_carries_types() {
        let fault = wrong_key("port", "u16", "alloc::string::String");
        assert_eq!(get_typed::<String>(Some(&fault), EXPECTED_TYPE_KEY).unwrap(), "u16");
        assert_eq!(
            get_typed::<String>(Some(&fault), ACTUAL_TYPE_KEY).unwrap(),
            "alloc::string::String"
        );
    }

    #[test]
    fn test_standard_faults_share_kind() {
        let a = no_such_key("a");
        let b = wrong_key("b", "u8", "i8");
        let c = nil_receiver();
        assert!(is(Some(&a), Some(&b)));
        assert!(!is(Some(&a), Some(&c)));
    }

    #[test]
    fn test_panic_fault_holds_value() {
        let fault = panic_fault(ContextEntry::new(42i32));
        assert_eq!(fault.to_string(), "(FATAL) a panic has occurred");
        assert_eq!(get_typed::<i32>(Some(&fault), PANIC_VALUE_KEY).unwrap(), 42);
    }
}
