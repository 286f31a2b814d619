//! flowstate - a versioned, permissioned, time-travelling state store for
//! multi-agent workflows
//!
//! - `store`: live items, the [`StateStore`] facade and its options
//! - `history`: commits, the bounded commit log and commit hooks
//! - `access`: permission sets and namespace patterns
//! - `snapshot`: replay of past state and snapshot diffs
//! - `persist`: the versioned, checksummed serialized form

pub mod access;
pub mod cli;
pub mod history;
pub mod namespace;
pub mod observability;
pub mod persist;
pub mod snapshot;
pub mod store;

pub use access::{NamespacePattern, Operation, PermissionSet};
pub use history::{Commit, CommitId, HookId, OperationKind};
pub use snapshot::{diff, Diff, Snapshot, SnapshotValue};
pub use store::{
    Item, OperationContext, StateStore, StoreConfig, StoreError, StoreResult, Timestamp,
};
