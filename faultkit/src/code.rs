//! Classification codes for faults

use std::fmt;

/// A symbolic classification attached to every fault.
///
/// Codes are small, copyable values (usually fieldless enums). The core only
/// ever compares them for equality and renders them through [`as_str`], so
/// several enumerations can live side by side: a fault is generic over exactly
/// one code type, and faults classified by different code types never compare
/// as the same kind.
///
/// [`as_str`]: FaultCode::as_str
pub trait FaultCode: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    /// Stable display name for this code
    fn as_str(&self) -> &'static str;
}

/// The standard code set used by the prebuilt faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StdCode {
    /// Origin not classified, e.g. a wrapped string or foreign error
    Unknown = -1,

    /// Unrecoverable condition, including recovered panics
    FatalError = 0,

    /// An operation failed on its own terms (assertions, context lookups)
    OperationFail = 1,

    /// The caller passed an invalid argument, e.g. an absent receiver
    BadParameter = 2,
}

impl StdCode {
    /// Numeric value of the code
    pub fn value(&self) -> i32 {
        *self as i32
    }
}

impl FaultCode for StdCode {
    fn as_str(&self) -> &'static str {
        match self {
            StdCode::Unknown => "UNKNOWN",
            StdCode::FatalError => "FATAL",
            StdCode::OperationFail => "Operation Failed",
            StdCode::BadParameter => "Bad Parameter",
        }
    }
}

impl fmt::Display for StdCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
