//! Assertion-style fault builders
//!
//! Re-exports the faultkit core types and provides checks that return `Ok`
//! when a condition holds and an [`StdCode::OperationFail`] fault otherwise.
//!
//! ```rust
//! use faultkit_assert::{ensure, not_none, Result};
//!
//! fn port(raw: Option<&str>) -> Result<u16> {
//!     let raw = not_none(raw, "raw")?;
//!     let port: u16 = faultkit_assert::check(raw.parse::<u16>(), format!("parse({:?})", raw))?;
//!     ensure!(port >= 1024, "port {} is privileged", port);
//!     Ok(port)
//! }
//!
//! assert_eq!(port(Some("8080")).unwrap(), 8080);
//! assert_eq!(port(None).unwrap_err().to_string(), "(Operation Failed) raw = None");
//! assert_eq!(
//!     port(Some("80")).unwrap_err().to_string(),
//!     "(Operation Failed) port 80 is privileged"
//! );
//! ```

pub use faultkit::{Fault, FaultRef, Result, StdCode};

use faultkit::BaseFault;
use std::any::{type_name, Any};
use std::fmt;

/// Name used when a check is given an empty variable name
pub const DEFAULT_NAME: &str = "variable";

fn name_or_default(name: &str) -> &str {
    if name.is_empty() {
        DEFAULT_NAME
    } else {
        name
    }
}

// =============================================================================
// Fault constructors
// =============================================================================

/// Create an assertion failure with the given message
pub fn fail(message: impl Into<String>) -> FaultRef {
    let fault = BaseFault::new(StdCode::OperationFail, message).into_ref();
    tracing::debug!(fault = %fault, "assertion failed");
    fault
}

/// Return early with an assertion failure unless the condition holds.
///
/// The message is only formatted when the condition fails.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return ::std::result::Result::Err($crate::fail(::std::format!($($arg)+)));
        }
    };
}

// =============================================================================
// Checks
// =============================================================================

/// Fail with `message` unless `cond` holds
pub fn cond(cond: bool, message: impl Into<String>) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(fail(message))
    }
}

/// Pass a successful result through; otherwise fail with `"<call> = <err>"`
pub fn check<T, E>(res: std::result::Result<T, E>, call: impl fmt::Display) -> Result<T>
where
    E: fmt::Display,
{
    res.map_err(|err| fail(format!("{} = {}", call, err)))
}

/// For calls that report success as `true`: fail with `"<call> = false"`
pub fn is_true(ok: bool, call: impl fmt::Display) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(fail(format!("{} = false", call)))
    }
}

/// For calls that report success as `false`: fail with `"<call> = true"`
pub fn is_false(ok: bool, call: impl fmt::Display) -> Result<()> {
    if ok {
        Err(fail(format!("{} = true", call)))
    } else {
        Ok(())
    }
}

/// Unwrap a present value; fail with `"<name> = None"`
pub fn not_none<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| fail(format!("{} = None", name_or_default(name))))
}

/// Pass a non-default value through; fail with `"<name> = <value>"`
pub fn not_zero<T>(value: T, name: &str) -> Result<T>
where
    T: Default + PartialEq + fmt::Debug,
{
    if value == T::default() {
        return Err(fail(format!("{} = {:?}", name_or_default(name), value)));
    }
    Ok(value)
}

/// Convert a type-erased value to `T`.
///
/// Fails when the value is absent or holds some other type.
pub fn conv<T>(value: Option<&dyn Any>, name: &str) -> Result<T>
where
    T: Any + Clone,
{
    let name = name_or_default(name);
    let Some(value) = value else {
        return Err(fail(format!("{} = None", name)));
    };

    value.downcast_ref::<T>().cloned().ok_or_else(|| {
        fail(format!(
            "{} holds a different type, want {}",
            name,
            type_name::<T>()
        ))
    })
}

/// Check a constructor's output: it must succeed and produce a value.
///
/// Fails with `"err = <err>"` or `"<type> = None"`.
pub fn constructed<T, E>(res: std::result::Result<Option<T>, E>) -> Result<T>
where
    E: fmt::Display,
{
    match res {
        Err(err) => Err(fail(format!("err = {}", err))),
        Ok(None) => Err(fail(format!("{} = None", type_name::<T>()))),
        Ok(Some(value)) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultkit::{is, standard::NO_SUCH_KEY};
    use serde_json::json;

    fn open_session(user: &str) -> Result<String> {
        ensure!(!user.is_empty(), "user {:?} must not be empty", user);
        Ok(format!("session-{}", user))
    }

    #[test]
    fn test_cond() {
        assert!(cond(true, "unused").is_ok());

        let err = cond("foo" == "bar", "foo must be bar").unwrap_err();
        assert_eq!(err.to_string(), "(Operation Failed) foo must be bar");
    }

    #[test]
    fn test_assertions_are_operation_failures() {
        let err = cond(false, "x").unwrap_err();
        let sample = NO_SUCH_KEY.instance().into_ref();
        assert!(is(Some(&sample), Some(&err)));
    }

    #[test]
    fn test_check() {
        assert_eq!(check("42".parse::<u8>(), "parse(\"42\")").unwrap(), 42);

        let err = check("x".parse::<u8>(), "parse(\"x\")").unwrap_err();
        assert_eq!(
            err.to_string(),
            "(Operation Failed) parse(\"x\") = invalid digit found in string"
        );
    }

    #[test]
    fn test_is_true_and_is_false() {
        assert!(is_true(true, "contains(k)").is_ok());
        assert_eq!(
            is_true(false, "contains(k)").unwrap_err().to_string(),
            "(Operation Failed) contains(k) = false"
        );

        assert!(is_false(false, "is_locked()").is_ok());
        assert_eq!(
            is_false(true, "is_locked()").unwrap_err().to_string(),
            "(Operation Failed) is_locked() = true"
        );
    }

    #[test]
    fn test_not_none() {
        assert_eq!(not_none(Some(3), "retries").unwrap(), 3);
        assert_eq!(
            not_none(None::<u8>, "retries").unwrap_err().to_string(),
            "(Operation Failed) retries = None"
        );
        assert_eq!(
            not_none(None::<u8>, "").unwrap_err().to_string(),
            "(Operation Failed) variable = None"
        );
    }

    #[test]
    fn test_not_zero() {
        assert_eq!(not_zero(5u32, "workers").unwrap(), 5);
        assert_eq!(
            not_zero(0u32, "workers").unwrap_err().to_string(),
            "(Operation Failed) workers = 0"
        );
        assert_eq!(
            not_zero(String::new(), "").unwrap_err().to_string(),
            "(Operation Failed) variable = \"\""
        );
    }

    #[test]
    fn test_conv() {
        let port: &dyn Any = &8080u16;
        assert_eq!(conv::<u16>(Some(port), "port").unwrap(), 8080);

        let err = conv::<String>(Some(port), "port").unwrap_err();
        assert!(err.to_string().starts_with("(Operation Failed) port holds a different type"));

        let body = json!({"ok": true});
        let value = conv::<serde_json::Value>(Some(&body as &dyn Any), "body").unwrap();
        assert_eq!(value["ok"], true);

        assert_eq!(
            conv::<u8>(None, "").unwrap_err().to_string(),
            "(Operation Failed) variable = None"
        );
    }

    #[test]
    fn test_constructed() {
        assert_eq!(constructed::<_, String>(Ok(Some(1))).unwrap(), 1);
        assert_eq!(
            constructed::<u8, _>(Err("refused")).unwrap_err().to_string(),
            "(Operation Failed) err = refused"
        );
        assert_eq!(
            constructed::<u8, String>(Ok(None)).unwrap_err().to_string(),
            "(Operation Failed) u8 = None"
        );
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(open_session("ana").unwrap(), "session-ana");
        assert_eq!(
            open_session("").unwrap_err().to_string(),
            "(Operation Failed) user \"\" must not be empty"
        );
    }
}
