//! Per-fault diagnostic payload: timestamp, frames and context

use chrono::{DateTime, SecondsFormat, Utc};
use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A type-erased context value.
///
/// Keeps the stored type's name (for mismatch reports) and a rendered form
/// (for [`Info::lines`]) next to the value itself. Cloning is cheap.
#[derive(Clone)]
pub struct ContextEntry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    rendered: String,
}

impl ContextEntry {
    /// Wrap a value for storage in a context map
    pub fn new<V>(value: V) -> Self
    where
        V: Any + Send + Sync + fmt::Debug,
    {
        let rendered = render(&value);
        Self {
            value: Arc::new(value),
            type_name: type_name::<V>(),
            rendered,
        }
    }

    /// Borrow the value if it is a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Check whether the stored value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the stored value's type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Human-readable form of the value
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Debug for ContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Strings render bare, everything else through `Debug`.
fn render<V: Any + fmt::Debug>(value: &V) -> String {
    let any = value as &dyn Any;
    if let Some(s) = any.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(s) = any.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    format!("{:?}", value)
}

#[derive(Default)]
struct InfoState {
    frames: Vec<String>,
    context: BTreeMap<String, ContextEntry>,
}

/// Mutable diagnostic payload owned by a single fault.
///
/// The timestamp is fixed at construction. Frames and context only grow, and
/// can be written through a shared reference so every holder of a fault can
/// annotate the same instance. Writes are serialized by an internal lock; the
/// relative order of frames appended concurrently from several threads is
/// whatever order the lock is acquired in.
pub struct Info {
    timestamp: DateTime<Utc>,
    state: Mutex<InfoState>,
}

impl Info {
    /// Create an empty store stamped with the current time
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            state: Mutex::new(InfoState::default()),
        }
    }

    /// When the owning fault was created
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Attach a value under `key`, replacing any previous value
    pub fn add_context<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync + fmt::Debug,
    {
        self.insert_entry(key.into(), ContextEntry::new(value));
    }

    /// Attach an already-wrapped value under `key`
    pub fn insert_entry(&self, key: String, entry: ContextEntry) {
        self.state().context.insert(key, entry);
    }

    /// Look up `key` in this store only
    pub fn get(&self, key: &str) -> Option<ContextEntry> {
        self.state().context.get(key).cloned()
    }

    /// Snapshot of the context keys, sorted
    pub fn keys(&self) -> Vec<String> {
        self.state().context.keys().cloned().collect()
    }

    /// Record a call site; the most recent append is the innermost call
    pub fn append_frame(&self, frame: impl Into<String>) {
        self.state().frames.push(frame.into());
    }

    /// Snapshot of the frames in append order
    pub fn frames(&self) -> Vec<String> {
        self.state().frames.clone()
    }

    /// Render the store for humans.
    ///
    /// ```text
    /// Timestamp: <rfc3339>
    /// Stack Trace:
    /// - <last appended> <- ... <- <first appended>
    /// Context:
    /// - <key>: <value>
    /// ```
    ///
    /// The stack trace and context sections are omitted when empty.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Timestamp: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
        )];

        let state = self.state();

        if !state.frames.is_empty() {
            lines.push("Stack Trace:".to_string());
            let trace: Vec<&str> = state.frames.iter().rev().map(String::as_str).collect();
            lines.push(format!("- {}", trace.join(" <- ")));
        }

        if !state.context.is_empty() {
            lines.push("Context:".to_string());
            for (key, entry) in &state.context {
                lines.push(format!("- {}: {}", key, entry.rendered()));
            }
        }

        lines
    }

    // A panic while the lock is held cannot leave frames or context half
    // written, so a poisoned lock is still safe to use.
    fn state(&self) -> MutexGuard<'_, InfoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Info {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Info")
            .field("timestamp", &self.timestamp)
            .field("frames", &state.frames)
            .field("context", &state.context)
            .finish()
    }
}
