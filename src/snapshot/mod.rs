//! Snapshot & diff engine
//!
//! Snapshots are reconstructed by replaying the retained commit log into a
//! fresh map. They are plain owned values: no back-reference to the live
//! store, and the store never touches them after handing them out.
//!
//! # Known limitation
//!
//! Replay is exact only for values retained in full. Values recorded as
//! reference stubs come back as [`SnapshotValue::Unavailable`]; commits
//! dropped by retention are simply absent, and a cutoff older than the oldest
//! retained commit is refused with `HistoryTruncated`.

mod diff;
mod replay;

pub use diff::{diff, Diff, KeyChange, DELETED_SENTINEL};
pub use replay::SnapshotEngine;

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::history::CommitId;
use crate::store::Timestamp;

/// A reconstructed value.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValue {
    Available(Value),
    /// History kept only a reference stub for this write
    Unavailable,
}

impl SnapshotValue {
    #[inline]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SnapshotValue::Unavailable)
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            SnapshotValue::Available(v) => Some(v),
            SnapshotValue::Unavailable => None,
        }
    }

    /// JSON form; unavailable values render as `{"unavailable": true}`.
    pub fn to_json(&self) -> Value {
        match self {
            SnapshotValue::Available(v) => v.clone(),
            SnapshotValue::Unavailable => json!({ "unavailable": true }),
        }
    }
}

impl Serialize for SnapshotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// State of one key as of the cutoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub value: SnapshotValue,
    /// Item version produced by the write, when recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Actor of the last write replayed for this key
    pub changed_by: String,
    pub commit_id: CommitId,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// What a snapshot was cut at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotCutoff {
    /// Every commit with timestamp <= the cutoff
    Timestamp(Timestamp),
    /// Every commit up to and including this one
    Commit(CommitId),
    /// Every commit strictly before this actor's first commit
    BeforeActor(String),
}

/// Independently owned copy of store state at a cutoff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    cutoff: SnapshotCutoff,
    entries: BTreeMap<String, SnapshotEntry>,
    replayed_commits: usize,
    last_commit: Option<CommitId>,
}

impl Snapshot {
    pub(crate) fn new(
        cutoff: SnapshotCutoff,
        entries: BTreeMap<String, SnapshotEntry>,
        replayed_commits: usize,
        last_commit: Option<CommitId>,
    ) -> Self {
        Self {
            cutoff,
            entries,
            replayed_commits,
            last_commit,
        }
    }

    pub fn cutoff(&self) -> &SnapshotCutoff {
        &self.cutoff
    }

    /// Number of commits replayed, reads included.
    pub fn replayed_commits(&self) -> usize {
        self.replayed_commits
    }

    /// Last commit inside the cutoff.
    pub fn last_commit(&self) -> Option<CommitId> {
        self.last_commit
    }

    pub fn get(&self, key: &str) -> Option<&SnapshotValue> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// Reconstructed value if it was retained in full.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(SnapshotValue::as_value)
    }

    pub fn entry(&self, key: &str) -> Option<&SnapshotEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True when `key` exists but its value was not retained.
    pub fn is_unavailable(&self, key: &str) -> bool {
        self.get(key).is_some_and(SnapshotValue::is_unavailable)
    }

    /// Keys in lexicographic order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &SnapshotEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove a key from this copy only.
    pub fn remove(&mut self, key: &str) -> Option<SnapshotEntry> {
        self.entries.remove(key)
    }

    /// Key to value map as JSON.
    pub fn to_json(&self) -> Value {
        let map = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.value.to_json()))
            .collect::<serde_json::Map<String, Value>>();
        Value::Object(map)
    }
}
