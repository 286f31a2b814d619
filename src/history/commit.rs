//! Commit - immutable record of one store operation
//!
//! - Writes carry previous and new values, reads carry none
//! - Oversized values are recorded as reference stubs
//! - `stored_size` is exactly what the commit charges the retention budget

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::size::{probe, ValueProbe};
use super::CommitId;
use crate::store::Timestamp;

/// Budget charged for a reference stub in place of a value.
pub const REFERENCE_STUB_COST: u64 = 64;

/// The kind of operation a commit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Write,
    Read,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Write => "write",
            OperationKind::Read => "read",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder recorded instead of an oversized value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceStub {
    pub too_large_for_history: bool,
    pub key: String,
    /// Encoded size of the value that was not retained
    pub size: u64,
}

/// A value as retained in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedValue {
    /// Retained in full; replay is exact
    Full(Value),
    /// Only a stub was kept; replay yields an unavailable marker
    Reference(ReferenceStub),
}

impl RecordedValue {
    /// Apply the per-value size policy.
    ///
    /// Returns the recorded form and the bytes it charges.
    pub fn record(key: &str, value: &Value, measured: &ValueProbe, limit: u64) -> (Self, u64) {
        if measured.size > limit {
            let stub = ReferenceStub {
                too_large_for_history: true,
                key: key.to_string(),
                size: measured.size,
            };
            (RecordedValue::Reference(stub), REFERENCE_STUB_COST)
        } else {
            (RecordedValue::Full(value.clone()), measured.size)
        }
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, RecordedValue::Reference(_))
    }

    /// The retained value, if it was kept in full.
    pub fn as_full(&self) -> Option<&Value> {
        match self {
            RecordedValue::Full(v) => Some(v),
            RecordedValue::Reference(_) => None,
        }
    }
}

/// Per-commit metadata copied from the operation context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Item version produced by a write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// Immutable record of one operation.
///
/// Fields are public for reading; commits are only built by the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub commit_id: CommitId,
    pub timestamp: Timestamp,
    pub actor_id: String,
    pub operation: OperationKind,
    pub key: String,
    /// Bounded textual preview of the value involved
    pub value_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_value: Option<RecordedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<RecordedValue>,
    pub stored_size: u64,
    #[serde(default)]
    pub metadata: CommitMetadata,
}

/// A commit before the log assigns its identity and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommit {
    pub actor_id: String,
    pub operation: OperationKind,
    pub key: String,
    pub value_summary: String,
    pub previous_value: Option<RecordedValue>,
    pub new_value: Option<RecordedValue>,
    pub stored_size: u64,
    pub metadata: CommitMetadata,
}

impl PendingCommit {
    /// A write of `new` over `previous`, sized per `limit`.
    pub fn write(
        actor_id: &str,
        key: &str,
        previous: Option<&Value>,
        new: &Value,
        limit: u64,
        summary_chars: usize,
        metadata: CommitMetadata,
    ) -> Self {
        let new_probe = probe(new, summary_chars);
        let (new_value, new_cost) = RecordedValue::record(key, new, &new_probe, limit);
        let (previous_value, previous_cost) = match previous {
            Some(prev) => {
                let (recorded, cost) = RecordedValue::record(key, prev, &probe(prev, 0), limit);
                (Some(recorded), cost)
            }
            None => (None, 0),
        };
        Self {
            actor_id: actor_id.to_string(),
            operation: OperationKind::Write,
            key: key.to_string(),
            value_summary: new_probe.preview,
            previous_value,
            new_value: Some(new_value),
            stored_size: new_cost + previous_cost,
            metadata,
        }
    }

    /// A read. Reads never retain values and charge nothing.
    pub fn read(actor_id: &str, key: &str, found: Option<&Value>, summary_chars: usize) -> Self {
        let value_summary = match found {
            Some(value) => probe(value, summary_chars).preview,
            None => "<absent>".to_string(),
        };
        Self {
            actor_id: actor_id.to_string(),
            operation: OperationKind::Read,
            key: key.to_string(),
            value_summary,
            previous_value: None,
            new_value: None,
            stored_size: 0,
            metadata: CommitMetadata::default(),
        }
    }

    /// A delete of `removed` (absent when nothing was live).
    pub fn delete(
        actor_id: &str,
        key: &str,
        removed: Option<&Value>,
        limit: u64,
        summary_chars: usize,
        metadata: CommitMetadata,
    ) -> Self {
        let (previous_value, stored_size, value_summary) = match removed {
            Some(value) => {
                let measured = probe(value, summary_chars);
                let (recorded, cost) = RecordedValue::record(key, value, &measured, limit);
                (Some(recorded), cost, measured.preview)
            }
            None => (None, 0, "<absent>".to_string()),
        };
        Self {
            actor_id: actor_id.to_string(),
            operation: OperationKind::Delete,
            key: key.to_string(),
            value_summary,
            previous_value,
            new_value: None,
            stored_size,
            metadata,
        }
    }

    pub(crate) fn seal(self, commit_id: CommitId, timestamp: Timestamp) -> Commit {
        Commit {
            commit_id,
            timestamp,
            actor_id: self.actor_id,
            operation: self.operation,
            key: self.key,
            value_summary: self.value_summary,
            previous_value: self.previous_value,
            new_value: self.new_value,
            stored_size: self.stored_size,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_write_keeps_both_values() {
        let pending = PendingCommit::write(
            "x",
            "a",
            Some(&json!(1)),
            &json!(22),
            1024,
            50,
            CommitMetadata::default(),
        );
        assert_eq!(pending.previous_value, Some(RecordedValue::Full(json!(1))));
        assert_eq!(pending.new_value, Some(RecordedValue::Full(json!(22))));
        assert_eq!(pending.stored_size, 3);
        assert_eq!(pending.value_summary, "22");
    }

    #[test]
    fn test_oversized_write_records_stub() {
        let big = json!("y".repeat(2000));
        let pending =
            PendingCommit::write("x", "big", None, &big, 1000, 10, CommitMetadata::default());

        match pending.new_value {
            Some(RecordedValue::Reference(ref stub)) => {
                assert!(stub.too_large_for_history);
                assert_eq!(stub.key, "big");
                assert_eq!(stub.size, 2002);
            }
            ref other => panic!("expected stub, got {:?}", other),
        }
        assert_eq!(pending.stored_size, REFERENCE_STUB_COST);
    }

    #[test]
    fn test_value_at_limit_is_kept_in_full() {
        let value = json!("abc");
        let (recorded, cost) = RecordedValue::record("k", &value, &probe(&value, 0), 5);
        assert!(!recorded.is_reference());
        assert_eq!(cost, 5);
    }

    #[test]
    fn test_read_charges_nothing() {
        let pending = PendingCommit::read("x", "a", Some(&json!({"n": 1})), 50);
        assert_eq!(pending.stored_size, 0);
        assert!(pending.previous_value.is_none());
        assert!(pending.new_value.is_none());
        assert_eq!(pending.operation, OperationKind::Read);
    }

    #[test]
    fn test_delete_records_removed_value() {
        let pending = PendingCommit::delete(
            "x",
            "a",
            Some(&json!(5)),
            1024,
            50,
            CommitMetadata::default(),
        );
        assert_eq!(pending.previous_value, Some(RecordedValue::Full(json!(5))));
        assert!(pending.new_value.is_none());
        assert_eq!(pending.stored_size, 1);

        let missing = PendingCommit::delete("x", "a", None, 1024, 50, CommitMetadata::default());
        assert_eq!(missing.stored_size, 0);
    }

    #[test]
    fn test_stub_wire_shape() {
        let stub = RecordedValue::Reference(ReferenceStub {
            too_large_for_history: true,
            key: "big".into(),
            size: 10,
        });
        let json = serde_json::to_value(&stub).unwrap();
        assert_eq!(json["reference"]["tooLargeForHistory"], true);
        assert_eq!(json["reference"]["size"], 10);
    }
}
