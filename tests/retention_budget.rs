//! Retention Budget Tests
//!
//! - Oldest commits are evicted first, never from the middle
//! - Once eviction triggers, every exceeded limit falls to <= 80%
//! - Retention never touches live items

use flowstate::history::LOW_WATER_PERCENT;
use flowstate::store::{ManualClock, OperationContext, StateStore, StoreConfig, Timestamp};
use proptest::prelude::*;
use serde_json::json;

const BUDGET: u64 = 10_000;

fn budget_store() -> StateStore {
    let config = StoreConfig::default()
        .with_max_history_bytes(BUDGET)
        .with_per_value_size_limit(4_000)
        .with_max_commit_count(1_000);
    StateStore::new(config).unwrap()
}

fn assert_suffix(store: &StateStore) {
    let ids: Vec<u64> = store.commits().map(|c| c.commit_id.value()).collect();
    for pair in ids.windows(2) {
        assert_eq!(pair[1], pair[0] + 1, "retained commits must be contiguous");
    }
}

// =============================================================================
// Byte Budget
// =============================================================================

/// Large values push the log over budget; eviction lands at <= 80%.
#[test]
fn test_byte_budget_eviction_hits_low_water() {
    let mut store = budget_store();
    let ctx = OperationContext::new("X");
    let low_water = BUDGET * LOW_WATER_PERCENT / 100;

    let mut saw_eviction = false;
    for i in 0..20 {
        let before = store.retention_stats().evicted_commits;
        store
            .write(&format!("k{}", i), json!("x".repeat(2_000)), &ctx)
            .unwrap();
        let stats = store.retention_stats();

        assert!(stats.retained_bytes <= BUDGET);
        if stats.evicted_commits > before {
            saw_eviction = true;
            assert!(stats.retained_bytes <= low_water);
        }
        assert_suffix(&store);
    }
    assert!(saw_eviction);

    // The newest commit is always retained
    assert_eq!(store.commits().last().unwrap().key, "k19");
    assert_eq!(store.metrics().evicted_commits, store.retention_stats().evicted_commits);
}

/// Eviction drops history only; every written key is still live.
#[test]
fn test_eviction_never_touches_live_items() {
    let mut store = budget_store();
    let ctx = OperationContext::new("X");
    for i in 0..30 {
        store
            .write(&format!("k{}", i), json!("y".repeat(1_500)), &ctx)
            .unwrap();
    }
    assert!(store.retention_stats().evicted_commits > 0);
    assert_eq!(store.len(), 30);
    assert!(store.commit(flowstate::CommitId::new(1)).is_none());
}

/// Reads are free and do not push the log over the byte budget.
#[test]
fn test_reads_charge_nothing() {
    let mut store = budget_store();
    store
        .write("a", json!("x".repeat(1_000)), &OperationContext::new("X"))
        .unwrap();
    let bytes = store.retention_stats().retained_bytes;
    for _ in 0..50 {
        store.read("a", "Y").unwrap();
    }
    assert_eq!(store.retention_stats().retained_bytes, bytes);
    assert_eq!(store.retention_stats().evicted_commits, 0);
}

/// With the largest value limit the budget allows, each overwrite evicts the
/// previous commit but keeps its own.
#[test]
fn test_largest_value_limit_keeps_latest_write() {
    let config = StoreConfig::default()
        .with_max_history_bytes(1_000)
        .with_per_value_size_limit(400);
    let clock = ManualClock::new(0);
    let mut store = StateStore::new(config).unwrap().with_clock(clock.clone());
    let ctx = OperationContext::new("X");

    for (t, fill) in [(100, "a"), (200, "b"), (300, "c")] {
        clock.set(t);
        // 398 chars encode to exactly 400 bytes, kept in full
        store.write("k", json!(fill.repeat(398)), &ctx).unwrap();

        let stats = store.retention_stats();
        assert!(stats.retained_commits >= 1);
        assert!(stats.retained_bytes <= 800);
        let snap = store.snapshot_at(Timestamp::from_millis(t)).unwrap();
        assert_eq!(snap.value("k"), Some(&json!(fill.repeat(398))));
    }
    assert!(store.retention_stats().evicted_commits > 0);
}

/// A byte budget no single write can fit under is refused up front.
#[test]
fn test_value_limit_near_budget_is_rejected() {
    let config = StoreConfig::default()
        .with_max_history_bytes(1_000)
        .with_per_value_size_limit(1_000);
    assert!(StateStore::new(config).is_err());
}

// =============================================================================
// Count Limit
// =============================================================================

#[test]
fn test_count_limit_of_one_retains_latest_commit() {
    let config = StoreConfig::default().with_max_commit_count(1);
    let clock = ManualClock::new(0);
    let mut store = StateStore::new(config).unwrap().with_clock(clock.clone());
    let ctx = OperationContext::new("X");

    for t in [100, 200, 300] {
        clock.set(t);
        store.write("a", json!(t), &ctx).unwrap();
        assert_eq!(store.retention_stats().retained_commits, 1);
        assert_eq!(store.commits_for_key("a").count(), 1);
        let snap = store.snapshot_at(Timestamp::from_millis(t)).unwrap();
        assert_eq!(snap.value("a"), Some(&json!(t)));
    }
    assert_eq!(store.retention_stats().evicted_commits, 2);
}

#[test]
fn test_count_limit_evicts_to_low_water() {
    let config = StoreConfig::default().with_max_commit_count(10);
    let mut store = StateStore::new(config).unwrap();
    let ctx = OperationContext::new("X");

    for i in 0..10 {
        store.write("k", json!(i), &ctx).unwrap();
    }
    assert_eq!(store.commits().len(), 10);

    store.write("k", json!(10), &ctx).unwrap();
    let stats = store.retention_stats();
    assert_eq!(stats.retained_commits, 8);
    assert_eq!(stats.evicted_commits, 3);
    assert_eq!(store.commits().next().unwrap().commit_id.value(), 4);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_budget_holds_after_every_write(
        writes in prop::collection::vec((0usize..6, 100usize..3_000), 1..60)
    ) {
        let mut store = budget_store();
        let ctx = OperationContext::new("X");
        let low_water = BUDGET * LOW_WATER_PERCENT / 100;

        for (key, size) in writes {
            let before = store.retention_stats().evicted_commits;
            store.write(&format!("k{}", key), json!("z".repeat(size)), &ctx).unwrap();
            let stats = store.retention_stats();

            prop_assert!(stats.retained_bytes <= BUDGET);
            if stats.evicted_commits > before {
                prop_assert!(stats.retained_bytes <= low_water);
            }
            let total: u64 = store.commits().map(|c| c.stored_size).sum();
            prop_assert_eq!(total, stats.retained_bytes);
        }
    }
}
