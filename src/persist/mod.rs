//! Serialized form of a store
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "checksum": "crc32:xxxxxxxx",
//!   "body": { items, commits, permissions, next_commit_id, evicted_commits }
//! }
//! ```
//!
//! The checksum covers the canonical JSON encoding of `body` (object keys
//! sorted). Decoding checks the version tag before anything else, so a file
//! from an unknown format is never guessed at.

mod checksum;

pub use checksum::{compute_checksum, format_checksum, parse_checksum};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::PermissionSet;
use crate::history::{Commit, CommitId};
use crate::store::{Item, StateStore, StoreError, StoreResult};

/// Current serialized form version.
pub const FORMAT_VERSION: u64 = 1;

/// Everything a store persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreImage {
    /// Live items ordered by key
    pub items: Vec<Item>,
    /// Retained commits, oldest first
    pub commits: Vec<Commit>,
    pub permissions: BTreeMap<String, PermissionSet>,
    pub next_commit_id: CommitId,
    #[serde(default)]
    pub evicted_commits: u64,
}

impl StoreImage {
    pub fn capture(store: &StateStore) -> Self {
        let log = store.log();
        Self {
            items: store.items().into_iter().cloned().collect(),
            commits: log.iter().cloned().collect(),
            permissions: store.access().permissions().clone(),
            next_commit_id: log.next_id(),
            evicted_commits: log.evicted_total(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Envelope {
    format_version: u64,
    checksum: String,
    body: Value,
}

/// Encode `store` into its versioned, checksummed form.
pub fn encode(store: &StateStore) -> StoreResult<Vec<u8>> {
    let body = serde_json::to_value(StoreImage::capture(store))?;
    let checksum = compute_checksum(&serde_json::to_vec(&body)?);
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        checksum: format_checksum(checksum),
        body,
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode and verify a serialized store.
pub fn decode(bytes: &[u8]) -> StoreResult<StoreImage> {
    let mut envelope: Value = serde_json::from_slice(bytes)?;

    let found = envelope
        .get("format_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::Serialization("missing format_version".to_string()))?;
    if found != FORMAT_VERSION {
        return Err(StoreError::SerializationVersionMismatch {
            found,
            expected: FORMAT_VERSION,
        });
    }

    let expected = envelope
        .get("checksum")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Serialization("missing checksum".to_string()))?;
    let body = envelope
        .get_mut("body")
        .map(Value::take)
        .ok_or_else(|| StoreError::Serialization("missing body".to_string()))?;

    let actual = compute_checksum(&serde_json::to_vec(&body)?);
    if parse_checksum(&expected) != Some(actual) {
        return Err(StoreError::ChecksumMismatch {
            expected,
            actual: format_checksum(actual),
        });
    }

    Ok(serde_json::from_value(body)?)
}
