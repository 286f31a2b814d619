//! # Store Errors
//!
//! Error kinds surfaced by every store operation.

use thiserror::Error;

use crate::access::Operation;
use crate::history::CommitId;
use crate::store::Timestamp;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    // ==================
    // Operation Errors
    // ==================
    /// Required read of a key that is not live
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    /// Strict-mode permission failure
    #[error("Access denied: actor '{actor_id}' may not {operation} key '{key}'")]
    AccessDenied {
        actor_id: String,
        key: String,
        operation: Operation,
    },

    /// Create-only write of a key that is already live
    #[error("Key already exists: {key}")]
    DuplicateKeyOnStrictCreate { key: String },

    // ==================
    // History Errors
    // ==================
    /// Snapshot requested at an unknown or evicted commit
    #[error("Commit not found: {commit_id}")]
    CommitNotFound { commit_id: CommitId },

    /// Snapshot cutoff predates the retained history
    #[error("History truncated: cutoff {requested} predates oldest retained commit ({})", display_oldest(.oldest_retained))]
    HistoryTruncated {
        requested: Timestamp,
        oldest_retained: Option<Timestamp>,
    },

    /// Actor has no commits in the retained log
    #[error("No commits recorded for actor: {actor_id}")]
    NoCommitsForActor { actor_id: String },

    // ==================
    // Namespace Errors
    // ==================
    /// Malformed namespace glob
    #[error("Invalid namespace pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Malformed namespace path in an operation context
    #[error("Invalid namespace '{namespace}': {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    // ==================
    // Persistence Errors
    // ==================
    /// Serialized form carries an unknown format version
    #[error("Unsupported serialization format version {found} (expected {expected})")]
    SerializationVersionMismatch { found: u64, expected: u64 },

    /// Serialized body does not match its checksum
    #[error("Checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Reading or writing a persisted store file failed
    #[error("I/O error: {0}")]
    Io(String),

    // ==================
    // Configuration Errors
    // ==================
    /// Construction options rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn display_oldest(oldest: &Option<Timestamp>) -> String {
    match oldest {
        Some(ts) => ts.to_string(),
        None => "none retained".to_string(),
    }
}

impl StoreError {
    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::KeyNotFound { .. } => "FLOWSTATE_KEY_NOT_FOUND",
            StoreError::AccessDenied { .. } => "FLOWSTATE_ACCESS_DENIED",
            StoreError::DuplicateKeyOnStrictCreate { .. } => "FLOWSTATE_DUPLICATE_KEY",
            StoreError::CommitNotFound { .. } => "FLOWSTATE_COMMIT_NOT_FOUND",
            StoreError::HistoryTruncated { .. } => "FLOWSTATE_HISTORY_TRUNCATED",
            StoreError::NoCommitsForActor { .. } => "FLOWSTATE_NO_COMMITS_FOR_ACTOR",
            StoreError::InvalidPattern { .. } => "FLOWSTATE_INVALID_PATTERN",
            StoreError::InvalidNamespace { .. } => "FLOWSTATE_INVALID_NAMESPACE",
            StoreError::SerializationVersionMismatch { .. } => "FLOWSTATE_VERSION_MISMATCH",
            StoreError::ChecksumMismatch { .. } => "FLOWSTATE_CHECKSUM_MISMATCH",
            StoreError::Serialization(_) => "FLOWSTATE_SERIALIZATION",
            StoreError::Io(_) => "FLOWSTATE_IO",
            StoreError::InvalidConfig(_) => "FLOWSTATE_INVALID_CONFIG",
        }
    }

    /// Whether lenient mode may recover this error locally as an absent result.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::KeyNotFound { .. } | StoreError::AccessDenied { .. }
        )
    }

    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_namespace(namespace: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidNamespace {
            namespace: namespace.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
