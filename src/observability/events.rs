//! Observable store events
//!
//! Events are explicit and typed. Each maps to one stable log event name.

use std::fmt;

/// Observable events emitted by a store instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store instance constructed
    StoreCreated,
    /// Store instance rebuilt from a serialized form
    StoreRestored,

    // Operations
    /// Item written (pack)
    ItemWritten,
    /// Item read (unpack)
    ItemRead,
    /// Optional read found nothing
    ItemMissing,
    /// Item deleted
    ItemDeleted,
    /// Access check denied an operation
    AccessDenied,

    // History
    /// Commits dropped by the retention policy
    RetentionEvicted,
    /// Value replaced by a reference stub in history
    ValueStubbed,
    /// Snapshot reconstructed from the commit log
    SnapshotReplayed,

    // Hooks
    /// A commit hook returned an error or panicked
    HookFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreCreated => "STORE_CREATED",
            Event::StoreRestored => "STORE_RESTORED",
            Event::ItemWritten => "ITEM_WRITTEN",
            Event::ItemRead => "ITEM_READ",
            Event::ItemMissing => "ITEM_MISSING",
            Event::ItemDeleted => "ITEM_DELETED",
            Event::AccessDenied => "ACCESS_DENIED",
            Event::RetentionEvicted => "RETENTION_EVICTED",
            Event::ValueStubbed => "VALUE_STUBBED",
            Event::SnapshotReplayed => "SNAPSHOT_REPLAYED",
            Event::HookFailed => "HOOK_FAILED",
        }
    }

    /// Severity this event is logged at.
    pub fn severity(&self) -> super::Severity {
        use super::Severity;
        match self {
            Event::ItemRead | Event::ItemWritten | Event::ItemDeleted => Severity::Trace,
            Event::AccessDenied | Event::ItemMissing | Event::ValueStubbed => Severity::Warn,
            Event::HookFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
