//! Per-instance store counters
//!
//! - Counters only, monotonic
//! - Reset only when the store instance is created

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one store instance.
///
/// Relaxed ordering is enough: counters are never used for synchronization.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    writes: AtomicU64,
    reads: AtomicU64,
    deletes: AtomicU64,
    denials: AtomicU64,
    evicted_commits: AtomicU64,
    stubbed_values: AtomicU64,
    hook_failures: AtomicU64,
    snapshots: AtomicU64,
}

impl StoreMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_writes(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reads(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_denials(&self) {
        self.denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_evicted(&self, count: u64) {
        self.evicted_commits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_stubbed(&self) {
        self.stubbed_values.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_hook_failures(&self) {
        self.hook_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_snapshots(&self) {
        self.snapshots.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            denials: self.denials.load(Ordering::Relaxed),
            evicted_commits: self.evicted_commits.load(Ordering::Relaxed),
            stubbed_values: self.stubbed_values.load(Ordering::Relaxed),
            hook_failures: self.hook_failures.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of [`StoreMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub writes: u64,
    pub reads: u64,
    pub deletes: u64,
    pub denials: u64,
    pub evicted_commits: u64,
    pub stubbed_values: u64,
    pub hook_failures: u64,
    pub snapshots: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(StoreMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let metrics = StoreMetrics::new();
        metrics.increment_writes();
        metrics.increment_writes();
        metrics.increment_reads();
        metrics.add_evicted(7);
        metrics.increment_hook_failures();

        let snap = metrics.snapshot();
        assert_eq!(snap.writes, 2);
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.evicted_commits, 7);
        assert_eq!(snap.hook_failures, 1);
        assert_eq!(snap.deletes, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = StoreMetrics::new();
        metrics.increment_denials();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["denials"], 1);
    }
}
