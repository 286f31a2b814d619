//! Structural difference between two snapshots
//!
//! A key only in B is added, only in A is deleted, in both with unequal
//! serialized values is modified.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::Snapshot;

/// `changed_by` recorded for keys removed between A and B.
pub const DELETED_SENTINEL: &str = "deleted";

/// Before/after detail for one changed key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyChange {
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// Actor of B's last write for the key, or `deleted`
    pub changed_by: String,
}

/// Changes from snapshot A to snapshot B. Key lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub per_key_detail: BTreeMap<String, KeyChange>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    /// e.g. `1 added, 2 modified, 0 deleted`
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} deleted",
            self.added.len(),
            self.modified.len(),
            self.deleted.len()
        )
    }
}

/// Compute the changes from `a` to `b`.
pub fn diff(a: &Snapshot, b: &Snapshot) -> Diff {
    let mut result = Diff::default();

    for (key, after) in b.entries() {
        match a.entry(key) {
            None => {
                result.added.push(key.to_string());
                result.per_key_detail.insert(
                    key.to_string(),
                    KeyChange {
                        before: None,
                        after: Some(after.value.to_json()),
                        changed_by: after.changed_by.clone(),
                    },
                );
            }
            Some(before) => {
                let before_json = before.value.to_json();
                let after_json = after.value.to_json();
                if before_json.to_string() != after_json.to_string() {
                    result.modified.push(key.to_string());
                    result.per_key_detail.insert(
                        key.to_string(),
                        KeyChange {
                            before: Some(before_json),
                            after: Some(after_json),
                            changed_by: after.changed_by.clone(),
                        },
                    );
                }
            }
        }
    }

    for (key, before) in a.entries() {
        if !b.contains_key(key) {
            result.deleted.push(key.to_string());
            result.per_key_detail.insert(
                key.to_string(),
                KeyChange {
                    before: Some(before.value.to_json()),
                    after: None,
                    changed_by: DELETED_SENTINEL.to_string(),
                },
            );
        }
    }

    result
}
