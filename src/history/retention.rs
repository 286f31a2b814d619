//! Retention policy for the commit log
//!
//! Two independent limits: commit count and retained bytes. When either is
//! exceeded, the oldest commits are dropped until every exceeded limit is
//! back at its low-water mark (80%).

use serde::{Deserialize, Serialize};

use crate::store::{StoreConfig, Timestamp};

/// Low-water mark, in percent of each limit.
pub const LOW_WATER_PERCENT: u64 = 80;

/// Count and byte limits for retained commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_commit_count: usize,
    max_history_bytes: u64,
}

/// How far an over-budget log must shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionTarget {
    /// Set when the count limit was exceeded
    pub max_count: Option<usize>,
    /// Set when the byte limit was exceeded
    pub max_bytes: Option<u64>,
}

impl EvictionTarget {
    /// Whether the log still has to drop its oldest commit.
    pub fn needs_eviction(&self, count: usize, bytes: u64) -> bool {
        self.max_count.is_some_and(|limit| count > limit)
            || self.max_bytes.is_some_and(|limit| bytes > limit)
    }
}

impl RetentionPolicy {
    pub fn new(max_commit_count: usize, max_history_bytes: u64) -> Self {
        Self {
            max_commit_count,
            max_history_bytes,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.max_commit_count, config.max_history_bytes)
    }

    #[inline]
    pub fn max_commit_count(&self) -> usize {
        self.max_commit_count
    }

    #[inline]
    pub fn max_history_bytes(&self) -> u64 {
        self.max_history_bytes
    }

    /// Never below 1, so the newest commit survives eviction.
    pub fn count_low_water(&self) -> usize {
        ((self.max_commit_count as u64 * LOW_WATER_PERCENT / 100) as usize).max(1)
    }

    pub fn bytes_low_water(&self) -> u64 {
        self.max_history_bytes / 100 * LOW_WATER_PERCENT
            + self.max_history_bytes % 100 * LOW_WATER_PERCENT / 100
    }

    /// None while both limits hold.
    pub fn plan(&self, count: usize, bytes: u64) -> Option<EvictionTarget> {
        let count_exceeded = count > self.max_commit_count;
        let bytes_exceeded = bytes > self.max_history_bytes;
        if !count_exceeded && !bytes_exceeded {
            return None;
        }
        Some(EvictionTarget {
            max_count: count_exceeded.then(|| self.count_low_water()),
            max_bytes: bytes_exceeded.then(|| self.bytes_low_water()),
        })
    }
}

/// Current usage of the commit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionStats {
    pub retained_commits: usize,
    pub retained_bytes: u64,
    /// Commits dropped by retention over the store's lifetime
    pub evicted_commits: u64,
    pub oldest_retained: Option<Timestamp>,
    pub newest_retained: Option<Timestamp>,
}
