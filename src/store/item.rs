//! Live items and the per-operation context
//!
//! - At most one Item per key
//! - Writes replace the whole value and bump `version`
//! - Namespace comes from the caller's context, never from the Item

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Timestamp;

/// Metadata stamped on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Identity of the last writer
    pub source_id: String,
    /// Dot-segmented namespace of the last write, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_namespace: Option<String>,
    pub timestamp: Timestamp,
    /// Starts at 1, +1 per write
    pub version: u64,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

/// Current value for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub value: Value,
    pub metadata: ItemMetadata,
}

impl Item {
    #[inline]
    pub fn version(&self) -> u64 {
        self.metadata.version
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.source_namespace.as_deref()
    }
}

/// Identity and placement supplied by the execution engine for one operation.
///
/// The store never infers any of these itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationContext {
    pub actor_id: String,
    pub namespace: Option<String>,
    pub tags: BTreeSet<String>,
}

impl OperationContext {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            namespace: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}
