//! Commit log
//!
//! - Append-only, one commit per operation, in call order
//! - Timestamps are non-decreasing
//! - Retention drops oldest-first, never from the middle

use std::collections::VecDeque;

use super::retention::{RetentionPolicy, RetentionStats};
use super::{Commit, CommitId, OperationKind, PendingCommit};
use crate::store::{StoreError, StoreResult, Timestamp};

/// Result of one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReport {
    pub commit_id: CommitId,
    /// Commits dropped by retention as a consequence of this append
    pub evicted: usize,
    /// Retained bytes after eviction
    pub retained_bytes: u64,
}

/// Ordered, bounded history of store operations.
#[derive(Debug, Clone)]
pub struct CommitLog {
    commits: VecDeque<Commit>,
    policy: RetentionPolicy,
    retained_bytes: u64,
    next_id: CommitId,
    last_timestamp: Option<Timestamp>,
    evicted_total: u64,
}

impl CommitLog {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            commits: VecDeque::new(),
            policy,
            retained_bytes: 0,
            next_id: CommitId::new(1),
            last_timestamp: None,
            evicted_total: 0,
        }
    }

    /// Rebuild a log from exported commits, then apply `policy`.
    ///
    /// Commits must have strictly increasing ids and non-decreasing
    /// timestamps. `next_id` is raised past every restored commit so
    /// identities are never reused.
    pub fn restore(
        policy: RetentionPolicy,
        commits: Vec<Commit>,
        next_id: CommitId,
        evicted_total: u64,
    ) -> StoreResult<(Self, usize)> {
        for pair in commits.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.commit_id <= prev.commit_id {
                return Err(StoreError::Serialization(format!(
                    "commit {} follows commit {}",
                    next.commit_id, prev.commit_id
                )));
            }
            if next.timestamp < prev.timestamp {
                return Err(StoreError::Serialization(format!(
                    "commit {} at {} precedes commit {} at {}",
                    next.commit_id, next.timestamp, prev.commit_id, prev.timestamp
                )));
            }
        }
        let retained_bytes = commits.iter().map(|c| c.stored_size).sum();
        let last_timestamp = commits.last().map(|c| c.timestamp);
        let highest = commits.iter().map(|c| c.commit_id.next()).max();
        let next_id = match highest {
            Some(h) if h > next_id => h,
            _ => next_id,
        };
        let mut log = Self {
            commits: commits.into(),
            policy,
            retained_bytes,
            next_id,
            last_timestamp,
            evicted_total,
        };
        let evicted = log.enforce_retention();
        Ok((log, evicted))
    }

    /// `now` clamped so it never precedes the last appended commit.
    pub fn clamp_timestamp(&self, now: Timestamp) -> Timestamp {
        match self.last_timestamp {
            Some(last) => last.max(now),
            None => now,
        }
    }

    /// Append without observing the sealed commit.
    pub fn append(&mut self, pending: PendingCommit, now: Timestamp) -> AppendReport {
        self.append_with(pending, now, |_| {})
    }

    /// Seal and append `pending`, let `observe` see the commit, then apply
    /// retention.
    ///
    /// The observer runs before eviction, so it sees every commit even when
    /// retention drops it immediately.
    pub fn append_with<F>(&mut self, pending: PendingCommit, now: Timestamp, observe: F) -> AppendReport
    where
        F: FnOnce(&Commit),
    {
        let timestamp = self.clamp_timestamp(now);
        let commit_id = self.next_id;
        self.next_id = commit_id.next();
        self.last_timestamp = Some(timestamp);

        let commit = pending.seal(commit_id, timestamp);
        self.retained_bytes += commit.stored_size;
        self.commits.push_back(commit);
        if let Some(commit) = self.commits.back() {
            observe(commit);
        }

        let evicted = self.enforce_retention();
        AppendReport {
            commit_id,
            evicted,
            retained_bytes: self.retained_bytes,
        }
    }

    /// Drop oldest commits until the policy holds. Returns the number dropped.
    ///
    /// The newest commit is never dropped.
    pub fn enforce_retention(&mut self) -> usize {
        let Some(target) = self.policy.plan(self.commits.len(), self.retained_bytes) else {
            return 0;
        };
        let mut evicted = 0;
        while self.commits.len() > 1
            && target.needs_eviction(self.commits.len(), self.retained_bytes)
        {
            match self.commits.pop_front() {
                Some(commit) => {
                    self.retained_bytes -= commit.stored_size;
                    evicted += 1;
                }
                None => break,
            }
        }
        self.evicted_total += evicted as u64;
        evicted
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Identity the next appended commit will receive.
    pub fn next_id(&self) -> CommitId {
        self.next_id
    }

    /// Commits dropped by retention over this log's lifetime.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    /// Whether retention has ever dropped history.
    pub fn is_truncated(&self) -> bool {
        self.evicted_total > 0
    }

    pub fn retained_bytes(&self) -> u64 {
        self.retained_bytes
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn oldest(&self) -> Option<&Commit> {
        self.commits.front()
    }

    pub fn newest(&self) -> Option<&Commit> {
        self.commits.back()
    }

    pub fn stats(&self) -> RetentionStats {
        RetentionStats {
            retained_commits: self.commits.len(),
            retained_bytes: self.retained_bytes,
            evicted_commits: self.evicted_total,
            oldest_retained: self.oldest().map(|c| c.timestamp),
            newest_retained: self.newest().map(|c| c.timestamp),
        }
    }

    /// Retained commits in chronological order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Commit> + ExactSizeIterator + Clone {
        self.commits.iter()
    }

    /// Position of a retained commit.
    pub fn position(&self, commit_id: CommitId) -> Option<usize> {
        // Identities are assigned in append order
        self.commits
            .binary_search_by_key(&commit_id, |c| c.commit_id)
            .ok()
    }

    pub fn get(&self, commit_id: CommitId) -> Option<&Commit> {
        self.position(commit_id).and_then(|i| self.commits.get(i))
    }

    /// The first `len` retained commits.
    pub fn prefix(&self, len: usize) -> impl Iterator<Item = &Commit> + Clone {
        self.commits.iter().take(len)
    }

    // ==================
    // Query surface
    // ==================

    /// Commits touching `key`, oldest first. Clone the iterator to restart it.
    pub fn commits_for_key<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = &'a Commit> + Clone + 'a {
        self.commits.iter().filter(move |c| c.key == key)
    }

    /// Commits at or after `timestamp`, oldest first.
    pub fn commits_since(
        &self,
        timestamp: Timestamp,
    ) -> impl Iterator<Item = &Commit> + Clone + '_ {
        // Timestamps are non-decreasing, so the match is a suffix
        let start = self.commits.partition_point(|c| c.timestamp < timestamp);
        self.commits.range(start..)
    }

    /// Commits recorded for `actor_id`, oldest first.
    pub fn commits_by_actor<'a>(
        &'a self,
        actor_id: &'a str,
    ) -> impl Iterator<Item = &'a Commit> + Clone + 'a {
        self.commits.iter().filter(move |c| c.actor_id == actor_id)
    }

    /// Commits of one operation kind, oldest first.
    pub fn commits_of_kind(
        &self,
        kind: OperationKind,
    ) -> impl Iterator<Item = &Commit> + Clone + '_ {
        self.commits.iter().filter(move |c| c.operation == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CommitMetadata, RecordedValue};
    use serde_json::json;

    fn write(actor: &str, key: &str, value: serde_json::Value) -> PendingCommit {
        PendingCommit::write(actor, key, None, &value, 1024, 40, CommitMetadata::default())
    }

    fn ts(ms: i64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        let a = log.append(write("x", "a", json!(1)), ts(1));
        let b = log.append(write("x", "b", json!(2)), ts(2));
        assert_eq!(a.commit_id, CommitId::new(1));
        assert_eq!(b.commit_id, CommitId::new(2));
        assert_eq!(log.next_id(), CommitId::new(3));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        log.append(write("x", "a", json!(1)), ts(200));
        log.append(write("x", "a", json!(2)), ts(100));
        let stamps: Vec<i64> = log.iter().map(|c| c.timestamp.as_millis()).collect();
        assert_eq!(stamps, vec![200, 200]);
    }

    #[test]
    fn test_count_limit_evicts_to_low_water() {
        let mut log = CommitLog::new(RetentionPolicy::new(10, 1_000_000));
        for i in 0..10 {
            assert_eq!(log.append(write("x", "k", json!(i)), ts(i)).evicted, 0);
        }
        let report = log.append(write("x", "k", json!(10)), ts(10));
        assert_eq!(report.evicted, 3);
        assert_eq!(log.len(), 8);
        assert_eq!(log.oldest().unwrap().commit_id, CommitId::new(4));
        assert_eq!(log.evicted_total(), 3);
        assert!(log.is_truncated());
    }

    #[test]
    fn test_byte_limit_evicts_oldest_first() {
        let mut log = CommitLog::new(RetentionPolicy::new(1000, 100));
        // Each value encodes to 22 bytes
        let value = json!("x".repeat(20));
        for i in 0..4 {
            log.append(write("x", "k", value.clone()), ts(i));
        }
        assert_eq!(log.retained_bytes(), 88);

        let report = log.append(write("x", "k", value), ts(4));
        assert!(report.evicted > 0);
        assert!(log.retained_bytes() <= 80);
        assert_eq!(log.retained_bytes(), report.retained_bytes);
        assert_eq!(log.newest().unwrap().commit_id, CommitId::new(5));
    }

    #[test]
    fn test_reads_are_free() {
        let mut log = CommitLog::new(RetentionPolicy::new(1000, 10));
        for i in 0..50 {
            log.append(PendingCommit::read("x", "k", Some(&json!(i)), 10), ts(i));
        }
        assert_eq!(log.retained_bytes(), 0);
        assert_eq!(log.len(), 50);
    }

    #[test]
    fn test_observer_sees_commit_before_eviction() {
        let mut log = CommitLog::new(RetentionPolicy::new(1, 1000));
        let mut seen = Vec::new();
        log.append_with(write("x", "a", json!(1)), ts(1), |c| seen.push(c.commit_id));
        log.append_with(write("x", "b", json!(2)), ts(2), |c| seen.push(c.commit_id));
        assert_eq!(seen, vec![CommitId::new(1), CommitId::new(2)]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.newest().unwrap().commit_id, CommitId::new(2));
    }

    #[test]
    fn test_count_limit_one_keeps_newest() {
        let mut log = CommitLog::new(RetentionPolicy::new(1, 1000));
        for i in 0..4 {
            log.append(write("x", "a", json!(i)), ts(i));
            assert_eq!(log.len(), 1);
            assert_eq!(log.newest().unwrap().timestamp, ts(i));
        }
        assert_eq!(log.evicted_total(), 3);
    }

    #[test]
    fn test_oversized_commit_is_never_evicted() {
        let mut log = CommitLog::new(RetentionPolicy::new(1000, 100));
        log.append(write("x", "a", json!(1)), ts(1));
        let report = log.append(write("x", "b", json!("y".repeat(200))), ts(2));
        assert_eq!(report.evicted, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.newest().unwrap().key, "b");
    }

    #[test]
    fn test_queries_filter_in_order() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        log.append(write("x", "a", json!(1)), ts(10));
        log.append(write("y", "b", json!(2)), ts(20));
        log.append(PendingCommit::read("y", "a", Some(&json!(1)), 10), ts(30));
        log.append(write("x", "a", json!(3)), ts(40));

        let for_a: Vec<u64> = log.commits_for_key("a").map(|c| c.commit_id.value()).collect();
        assert_eq!(for_a, vec![1, 3, 4]);

        let by_y: Vec<u64> = log.commits_by_actor("y").map(|c| c.commit_id.value()).collect();
        assert_eq!(by_y, vec![2, 3]);

        let since: Vec<u64> = log.commits_since(ts(20)).map(|c| c.commit_id.value()).collect();
        assert_eq!(since, vec![2, 3, 4]);

        assert_eq!(log.commits_of_kind(OperationKind::Read).count(), 1);
    }

    #[test]
    fn test_queries_are_restartable() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        log.append(write("x", "a", json!(1)), ts(1));
        log.append(write("x", "a", json!(2)), ts(2));

        let query = log.commits_for_key("a");
        assert_eq!(query.clone().count(), 2);
        assert_eq!(query.count(), 2);
    }

    #[test]
    fn test_position_and_get() {
        let mut log = CommitLog::new(RetentionPolicy::new(3, 10_000));
        for i in 0..5 {
            log.append(write("x", "a", json!(i)), ts(i));
        }
        // 4 > 3 triggers eviction down to 2, then the fifth append fits
        assert_eq!(log.len(), 3);
        assert!(log.get(CommitId::new(1)).is_none());
        assert_eq!(log.position(CommitId::new(5)), Some(2));
        assert_eq!(
            log.get(CommitId::new(5)).unwrap().new_value,
            Some(RecordedValue::Full(json!(4)))
        );
    }

    #[test]
    fn test_restore_keeps_identity_sequence() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        log.append(write("x", "a", json!(1)), ts(1));
        log.append(write("x", "a", json!(2)), ts(2));
        let commits: Vec<Commit> = log.iter().cloned().collect();

        let (mut restored, evicted) =
            CommitLog::restore(log.policy(), commits, CommitId::new(1), 4).unwrap();
        assert_eq!(evicted, 0);
        assert_eq!(restored.next_id(), CommitId::new(3));
        assert_eq!(restored.evicted_total(), 4);
        assert_eq!(restored.retained_bytes(), log.retained_bytes());

        let report = restored.append(write("x", "a", json!(3)), ts(0));
        assert_eq!(report.commit_id, CommitId::new(3));
        assert_eq!(restored.newest().unwrap().timestamp, ts(2));
    }

    #[test]
    fn test_restore_applies_smaller_policy() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        for i in 0..10 {
            log.append(write("x", "a", json!(i)), ts(i));
        }
        let commits: Vec<Commit> = log.iter().cloned().collect();
        let (restored, evicted) =
            CommitLog::restore(RetentionPolicy::new(5, 10_000), commits, log.next_id(), 0)
                .unwrap();
        assert_eq!(evicted, 6);
        assert_eq!(restored.len(), 4);
    }

    #[test]
    fn test_restore_rejects_out_of_order_commits() {
        let mut log = CommitLog::new(RetentionPolicy::new(100, 10_000));
        log.append(write("x", "a", json!(1)), ts(10));
        log.append(write("x", "a", json!(2)), ts(20));
        let commits: Vec<Commit> = log.iter().cloned().collect();

        let mut swapped = commits.clone();
        swapped.reverse();
        assert!(matches!(
            CommitLog::restore(log.policy(), swapped, log.next_id(), 0),
            Err(StoreError::Serialization(_))
        ));

        let mut rewound = commits;
        rewound[1].timestamp = ts(5);
        assert!(matches!(
            CommitLog::restore(log.policy(), rewound, log.next_id(), 0),
            Err(StoreError::Serialization(_))
        ));
    }
}
