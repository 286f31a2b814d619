//! Commit log and retention
//!
//! This module provides:
//! - `CommitId` - totally ordered commit identity
//! - `Commit` - immutable record of one operation
//! - `CommitLog` - append-only, bounded history with query surface
//! - `RetentionPolicy` - count and byte budgets with 80% hysteresis
//! - `CommitHooks` - synchronous, failure-isolated commit notifications

mod commit;
mod commit_id;
mod hooks;
mod log;
mod retention;
mod size;

pub use commit::{
    Commit, CommitMetadata, OperationKind, PendingCommit, RecordedValue, ReferenceStub,
    REFERENCE_STUB_COST,
};
pub use commit_id::CommitId;
pub use hooks::{CommitCallback, CommitHooks, HookError, HookId};
pub use log::{AppendReport, CommitLog};
pub use retention::{EvictionTarget, RetentionPolicy, RetentionStats, LOW_WATER_PERCENT};
pub use size::{probe, ValueProbe};
