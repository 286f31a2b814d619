//! # Versioned Store
//!
//! Live items keyed by string, stamped with the caller's identity,
//! namespace and tags, and versioned per key.
//!
//! [`StateStore`] is the entry point: it owns the live items together with
//! the commit log, access control and commit hooks of one instance.

mod clock;
mod config;
mod errors;
mod item;
mod state;
mod versioned;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::{
    StoreConfig, DEFAULT_MAX_COMMIT_COUNT, DEFAULT_MAX_HISTORY_BYTES,
    DEFAULT_PER_VALUE_SIZE_LIMIT, DEFAULT_SUMMARY_MAX_CHARS,
};
pub use errors::{StoreError, StoreResult};
pub use item::{Item, ItemMetadata, OperationContext};
pub use state::StateStore;
pub use versioned::VersionedStore;
