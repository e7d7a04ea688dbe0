//! The Fault trait and its concrete shapes

use crate::code::FaultCode;
use crate::info::{ContextEntry, Info};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Message used when a fault is built from an empty or blank message
pub const FALLBACK_MESSAGE: &str = "something went wrong";

/// Shared handle to any fault.
///
/// Cloning the handle does not copy the fault: every clone sees (and can add
/// to) the same context and frames.
pub type FaultRef = Arc<dyn Fault>;

/// A structured failure value.
///
/// Concrete faults opt into capabilities by overriding the `as_*` probes.
/// The free functions in [`crate::context`] and [`crate::tower`] walk the
/// tower of embeds looking for the first fault that offers the capability
/// they need, so a thin wrapper can delegate storage to the fault it embeds.
///
/// Implementations must never (transitively) embed themselves.
pub trait Fault: std::error::Error + Send + Sync + 'static {
    /// The fault this one wraps, if any
    fn embeds(&self) -> Option<FaultRef> {
        None
    }

    /// Diagnostic lines for this fault alone (not its embeds)
    fn lines(&self) -> Vec<String> {
        Vec::new()
    }

    /// Key/value context storage, if this fault owns one
    fn as_context_mutable(&self) -> Option<&dyn ContextMutable> {
        None
    }

    /// Frame storage, if this fault owns one
    fn as_frame_appendable(&self) -> Option<&dyn FrameAppendable> {
        None
    }

    /// Classification equality, if this fault carries a code
    fn as_comparable(&self) -> Option<&dyn ClassificationComparable> {
        None
    }

    /// A sibling of the same kind with a different message and fresh info.
    ///
    /// `None` for a fault without a code.
    fn instance_of(&self, message: &str) -> Option<FaultRef> {
        self.as_comparable().map(|c| c.sibling(message))
    }
}

/// Capability: owns a context map.
pub trait ContextMutable {
    /// Store `entry` under `key`, replacing any previous value
    fn add_context_entry(&self, key: String, entry: ContextEntry);

    /// Look up `key` in this fault's own map
    fn context_entry(&self, key: &str) -> Option<ContextEntry>;
}

/// Capability: owns a frame list.
pub trait FrameAppendable {
    /// Append a call-site label
    fn append_frame(&self, frame: String);
}

/// Capability: carries a classification code.
pub trait ClassificationComparable {
    /// The code, type-erased so faults of unknown shape can be compared
    fn code_any(&self) -> &dyn Any;

    /// Whether `target` has the same code, from the same code enumeration
    fn is_fault(&self, target: &dyn Fault) -> bool;

    /// A new root fault of the same shape and code carrying `message`
    fn sibling(&self, message: &str) -> FaultRef;
}

fn same_code<C: FaultCode>(code: C, target: &dyn Fault) -> bool {
    target
        .as_comparable()
        .and_then(|c| c.code_any().downcast_ref::<C>())
        .is_some_and(|other| *other == code)
}

fn normalize_message(message: String) -> String {
    if message.trim().is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        message
    }
}

/// The full-featured fault: code, message, owned [`Info`] and an optional
/// embedded cause.
///
/// # Example
///
/// ```rust
/// use faultkit::{BaseFault, Fault, StdCode};
///
/// let cause = BaseFault::new(StdCode::FatalError, "disk full").into_ref();
/// let fault = BaseFault::wrap(StdCode::OperationFail, "cannot save snapshot", cause)
///     .with_frame("snapshot::save")
///     .with_context("path", "/var/lib/app/snap.bin");
///
/// assert_eq!(fault.to_string(), "(Operation Failed) cannot save snapshot");
/// assert!(fault.embeds().is_some());
/// ```
pub struct BaseFault<C: FaultCode> {
    code: C,
    message: String,
    info: Info,
    embeds: Option<FaultRef>,
    source: Option<anyhow::Error>,
}

impl<C: FaultCode> BaseFault<C> {
    /// Create a root fault. A blank message becomes [`FALLBACK_MESSAGE`].
    pub fn new(code: C, message: impl Into<String>) -> Self {
        Self {
            code,
            message: normalize_message(message.into()),
            info: Info::new(),
            embeds: None,
            source: None,
        }
    }

    /// Create a fault that embeds `inner`
    pub fn wrap(code: C, message: impl Into<String>, inner: FaultRef) -> Self {
        Self::new(code, message).with_embed(inner)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// Get the classification code
    pub fn code(&self) -> C {
        self.code
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the diagnostic store
    pub fn info(&self) -> &Info {
        &self.info
    }

    /// When this fault was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.info.timestamp()
    }

    /// Get the foreign error this fault was built from (if any)
    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    // =========================================================================
    // Builders (chainable)
    // =========================================================================

    /// Embed `inner` as the cause of this fault.
    ///
    /// The fault is not shared yet, so it cannot already be part of `inner`'s
    /// tower.
    pub fn with_embed(mut self, inner: FaultRef) -> Self {
        self.embeds = Some(inner);
        self
    }

    /// Add context to the fault
    pub fn with_context<V>(self, key: impl Into<String>, value: V) -> Self
    where
        V: Any + Send + Sync + fmt::Debug,
    {
        self.info.add_context(key, value);
        self
    }

    /// Append a frame to the fault
    pub fn with_frame(self, frame: impl Into<String>) -> Self {
        self.info.append_frame(frame);
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    /// Share the fault
    pub fn into_ref(self) -> FaultRef {
        Arc::new(self)
    }

    // =========================================================================
    // Shared mutation
    // =========================================================================

    /// A sibling of the same kind with a different message and fresh info
    pub fn instance_of(&self, message: impl Into<String>) -> Self {
        Self::new(self.code, message)
    }

    /// Attach a value to this fault's own context
    pub fn add_context<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync + fmt::Debug,
    {
        self.info.add_context(key, value);
    }

    /// Append a frame to this fault's own trace
    pub fn append_frame(&self, frame: impl Into<String>) {
        self.info.append_frame(frame);
    }

    /// Look up `key` in this fault's own context (not its embeds)
    pub fn get(&self, key: &str) -> Option<ContextEntry> {
        self.info.get(key)
    }
}

impl<C: FaultCode> Fault for BaseFault<C> {
    fn embeds(&self) -> Option<FaultRef> {
        self.embeds.clone()
    }

    fn lines(&self) -> Vec<String> {
        self.info.lines()
    }

    fn as_context_mutable(&self) -> Option<&dyn ContextMutable> {
        Some(self)
    }

    fn as_frame_appendable(&self) -> Option<&dyn FrameAppendable> {
        Some(self)
    }

    fn as_comparable(&self) -> Option<&dyn ClassificationComparable> {
        Some(self)
    }
}

impl<C: FaultCode> ContextMutable for BaseFault<C> {
    fn add_context_entry(&self, key: String, entry: ContextEntry) {
        self.info.insert_entry(key, entry);
    }

    fn context_entry(&self, key: &str) -> Option<ContextEntry> {
        self.info.get(key)
    }
}

impl<C: FaultCode> FrameAppendable for BaseFault<C> {
    fn append_frame(&self, frame: String) {
        self.info.append_frame(frame);
    }
}

impl<C: FaultCode> ClassificationComparable for BaseFault<C> {
    fn code_any(&self) -> &dyn Any {
        &self.code
    }

    fn is_fault(&self, target: &dyn Fault) -> bool {
        same_code(self.code, target)
    }

    fn sibling(&self, message: &str) -> FaultRef {
        Self::new(self.code, message).into_ref()
    }
}

// =============================================================================
// Display - "(CODE) message"
// =============================================================================

impl<C: FaultCode> fmt::Display for BaseFault<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code.as_str(), self.message)
    }
}

// =============================================================================
// Debug - verbose, multi-line format for debugging
// =============================================================================

impl<C: FaultCode> fmt::Debug for BaseFault<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self)?;

        for line in self.info.lines() {
            writeln!(f, "    {}", line)?;
        }

        if let Some(inner) = &self.embeds {
            writeln!(f)?;
            writeln!(f, "    Embeds: {}", inner)?;
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

impl<C: FaultCode> std::error::Error for BaseFault<C> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// A lightweight fault with no [`Info`] of its own.
///
/// Context and frames written through the tower-aware accessors land in the
/// first fault it embeds that has storage.
pub struct BareFault<C: FaultCode> {
    code: C,
    message: String,
    embeds: Option<FaultRef>,
}

impl<C: FaultCode> BareFault<C> {
    /// Create a root bare fault
    pub fn new(code: C, message: impl Into<String>) -> Self {
        Self {
            code,
            message: normalize_message(message.into()),
            embeds: None,
        }
    }

    /// Create a bare fault that embeds `inner`
    pub fn wrap(code: C, message: impl Into<String>, inner: FaultRef) -> Self {
        Self {
            embeds: Some(inner),
            ..Self::new(code, message)
        }
    }

    /// Get the classification code
    pub fn code(&self) -> C {
        self.code
    }

    /// Get the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Share the fault
    pub fn into_ref(self) -> FaultRef {
        Arc::new(self)
    }
}

impl<C: FaultCode> Fault for BareFault<C> {
    fn embeds(&self) -> Option<FaultRef> {
        self.embeds.clone()
    }

    fn as_comparable(&self) -> Option<&dyn ClassificationComparable> {
        Some(self)
    }
}

impl<C: FaultCode> ClassificationComparable for BareFault<C> {
    fn code_any(&self) -> &dyn Any {
        &self.code
    }

    fn is_fault(&self, target: &dyn Fault) -> bool {
        same_code(self.code, target)
    }

    fn sibling(&self, message: &str) -> FaultRef {
        Self::new(self.code, message).into_ref()
    }
}

impl<C: FaultCode> fmt::Display for BareFault<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code.as_str(), self.message)
    }
}

impl<C: FaultCode> fmt::Debug for BareFault<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BareFault")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("embeds", &self.embeds.as_ref().map(|e| e.to_string()))
            .finish()
    }
}

impl<C: FaultCode> std::error::Error for BareFault<C> {}

/// A reusable (code, message) pair from which faults of one kind are built.
///
/// Blueprints are plain `const` values, so a table of standard faults needs
/// no runtime initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blueprint<C> {
    code: C,
    message: &'static str,
}

impl<C: FaultCode> Blueprint<C> {
    /// Create a blueprint; usable in `const` items
    pub const fn new(code: C, message: &'static str) -> Self {
        Self { code, message }
    }

    /// Get the classification code
    pub fn code(&self) -> C {
        self.code
    }

    /// Get the default message
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Build a fresh fault with the blueprint's message
    pub fn instance(&self) -> BaseFault<C> {
        BaseFault::new(self.code, self.message)
    }

    /// Build a fresh fault of this kind with a different message
    pub fn instance_of(&self, message: impl Into<String>) -> BaseFault<C> {
        BaseFault::new(self.code, message)
    }
}

impl<C: FaultCode> fmt::Display for Blueprint<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.code.as_str(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::StdCode;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum DiskCode {
        Full,
    }

    impl FaultCode for DiskCode {
        fn as_str(&self) -> &'static str {
            "DISK_FULL"
        }
    }

    #[test]
    fn test_fault_creation() {
        let fault = BaseFault::new(StdCode::FatalError, "disk full");
        assert_eq!(fault.code(), StdCode::FatalError);
        assert_eq!(fault.message(), "disk full");
        assert_eq!(fault.to_string(), "(FATAL) disk full");
        assert!(fault.embeds().is_none());
    }

    #[test]
    fn test_blank_message_falls_back() {
        assert_eq!(BaseFault::new(StdCode::Unknown, "").message(), FALLBACK_MESSAGE);
        assert_eq!(BaseFault::new(StdCode::Unknown, "   ").message(), FALLBACK_MESSAGE);
        assert_eq!(BareFault::new(StdCode::Unknown, "\n").message(), FALLBACK_MESSAGE);
        assert_eq!(
            BaseFault::new(StdCode::Unknown, "").to_string(),
            "(UNKNOWN) something went wrong"
        );
    }

    #[test]
    fn test_instance_of_keeps_code() {
        let a = BaseFault::new(StdCode::FatalError, "disk full");
        a.add_context("device", "sda");
        let b = a.instance_of("disk full on retry");

        assert_eq!(b.code(), a.code());
        assert_ne!(b.to_string(), a.to_string());
        assert!(b.get("device").is_none());
        assert!(a.is_fault(&b));
    }

    #[test]
    fn test_instance_of_through_shared_handle() {
        let a = BaseFault::new(DiskCode::Full, "no space").with_context("device", "sda").into_ref();
        let b = a.instance_of("no space on retry").unwrap();

        assert_eq!(b.to_string(), "(DISK_FULL) no space on retry");
        assert!(b.as_context_mutable().unwrap().context_entry("device").is_none());
        assert!(a.as_comparable().unwrap().is_fault(&*b));

        let bare = BareFault::new(StdCode::OperationFail, "queue full").into_ref();
        let sibling = bare.instance_of("queue still full").unwrap();
        assert_eq!(sibling.to_string(), "(Operation Failed) queue still full");
        assert!(sibling.as_context_mutable().is_none());
        assert!(bare.as_comparable().unwrap().is_fault(&*sibling));
    }

    #[test]
    fn test_shared_mutation_through_handles() {
        let fault = BaseFault::new(StdCode::OperationFail, "load failed");
        fault.add_context("attempt", 1u8);
        let shared = fault.into_ref();
        let other = Arc::clone(&shared);

        other
            .as_context_mutable()
            .unwrap()
            .add_context_entry("file".to_string(), ContextEntry::new("app.toml"));
        other.as_frame_appendable().unwrap().append_frame("load".to_string());

        let store = shared.as_context_mutable().unwrap();
        assert!(store.context_entry("file").is_some());
        assert!(store.context_entry("attempt").is_some());
        assert!(shared.lines().iter().any(|l| l == "- load"));
    }

    #[test]
    fn test_builders() {
        let fault = BaseFault::new(StdCode::BadParameter, "bad port")
            .with_context("port", 70000u32)
            .with_frame("config::parse")
            .with_frame("main");

        assert_eq!(fault.get("port").unwrap().downcast_ref::<u32>(), Some(&70000));
        assert_eq!(fault.info().frames(), vec!["config::parse", "main"]);
    }

    #[test]
    fn test_cross_enumeration_never_same_kind() {
        let disk = BaseFault::new(DiskCode::Full, "no space");
        let std = BaseFault::new(StdCode::FatalError, "no space");
        assert!(!disk.is_fault(&std));
        assert!(!std.is_fault(&disk));
        assert!(disk.is_fault(&BareFault::new(DiskCode::Full, "other")));
    }

    #[test]
    fn test_bare_fault_capabilities() {
        let inner = BaseFault::new(StdCode::Unknown, "root").into_ref();
        let bare = BareFault::wrap(StdCode::OperationFail, "wrapper", inner);

        assert!(bare.as_context_mutable().is_none());
        assert!(bare.as_frame_appendable().is_none());
        assert!(bare.as_comparable().is_some());
        assert!(bare.lines().is_empty());
        assert_eq!(bare.embeds().unwrap().to_string(), "(UNKNOWN) root");
    }

    #[test]
    fn test_set_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let fault = BaseFault::new(StdCode::Unknown, "config.json not found").set_source(io_err);

        assert!(fault.source_ref().is_some());
        assert!(std::error::Error::source(&fault).is_some());
    }

    #[test]
    fn test_debug_is_verbose() {
        let cause = BaseFault::new(StdCode::FatalError, "disk full").into_ref();
        let fault = BaseFault::wrap(StdCode::OperationFail, "save failed", cause)
            .with_context("path", "/tmp/x");

        let debug = format!("{:?}", fault);
        assert!(debug.starts_with("(Operation Failed) save failed"));
        assert!(debug.contains("Timestamp: "));
        assert!(debug.contains("- path: /tmp/x"));
        assert!(debug.contains("Embeds: (FATAL) disk full"));
    }

    #[test]
    fn test_blueprint() {
        const DISK_FULL: Blueprint<DiskCode> = Blueprint::new(DiskCode::Full, "disk is full");

        let a = DISK_FULL.instance();
        let b = DISK_FULL.instance_of("disk is full on /var");
        assert_eq!(a.message(), "disk is full");
        assert_eq!(DISK_FULL.to_string(), "(DISK_FULL) disk is full");
        assert!(a.is_fault(&b));
    }
}
