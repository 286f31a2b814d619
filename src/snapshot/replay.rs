//! Commit log replay
//!
//! - write installs `new_value` (stub -> Unavailable)
//! - delete removes the key
//! - read is a no-op

use std::collections::BTreeMap;

use super::{Snapshot, SnapshotCutoff, SnapshotEntry, SnapshotValue};
use crate::history::{Commit, CommitId, CommitLog, OperationKind, RecordedValue};
use crate::store::{StoreError, StoreResult, Timestamp};

/// Reconstructs past state from a borrowed commit log.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotEngine<'a> {
    log: &'a CommitLog,
}

impl<'a> SnapshotEngine<'a> {
    pub fn new(log: &'a CommitLog) -> Self {
        Self { log }
    }

    /// State after every commit with `timestamp <= cutoff`.
    pub fn at(&self, cutoff: Timestamp) -> StoreResult<Snapshot> {
        self.ensure_covered(cutoff)?;
        let commits = self.log.iter().take_while(|c| c.timestamp <= cutoff);
        Ok(replay(commits, SnapshotCutoff::Timestamp(cutoff)))
    }

    /// State after the commit `commit_id`, inclusive.
    pub fn at_commit(&self, commit_id: CommitId) -> StoreResult<Snapshot> {
        let position = self
            .log
            .position(commit_id)
            .ok_or(StoreError::CommitNotFound { commit_id })?;
        Ok(replay(
            self.log.prefix(position + 1),
            SnapshotCutoff::Commit(commit_id),
        ))
    }

    /// State strictly before `actor_id`'s first retained commit.
    pub fn before_actor(&self, actor_id: &str) -> StoreResult<Snapshot> {
        let (position, first) = self
            .log
            .iter()
            .enumerate()
            .find(|(_, c)| c.actor_id == actor_id)
            .ok_or_else(|| StoreError::NoCommitsForActor {
                actor_id: actor_id.to_string(),
            })?;
        // The state before the oldest retained commit depends on evicted history
        if position == 0 && self.log.is_truncated() {
            return Err(StoreError::HistoryTruncated {
                requested: first.timestamp,
                oldest_retained: Some(first.timestamp),
            });
        }
        Ok(replay(
            self.log.prefix(position),
            SnapshotCutoff::BeforeActor(actor_id.to_string()),
        ))
    }

    /// Refuse cutoffs older than the retained window once eviction happened.
    fn ensure_covered(&self, cutoff: Timestamp) -> StoreResult<()> {
        if !self.log.is_truncated() {
            return Ok(());
        }
        match self.log.oldest() {
            Some(oldest) if cutoff >= oldest.timestamp => Ok(()),
            oldest => Err(StoreError::HistoryTruncated {
                requested: cutoff,
                oldest_retained: oldest.map(|c| c.timestamp),
            }),
        }
    }
}

/// Replay `commits` into a fresh map.
pub(crate) fn replay<'c>(
    commits: impl Iterator<Item = &'c Commit>,
    cutoff: SnapshotCutoff,
) -> Snapshot {
    let mut entries: BTreeMap<String, SnapshotEntry> = BTreeMap::new();
    let mut replayed = 0;
    let mut last_commit = None;

    for commit in commits {
        replayed += 1;
        last_commit = Some(commit.commit_id);
        match commit.operation {
            OperationKind::Write => {
                let value = match &commit.new_value {
                    Some(RecordedValue::Full(v)) => SnapshotValue::Available(v.clone()),
                    Some(RecordedValue::Reference(_)) | None => SnapshotValue::Unavailable,
                };
                entries.insert(
                    commit.key.clone(),
                    SnapshotEntry {
                        value,
                        version: commit.metadata.version,
                        changed_by: commit.actor_id.clone(),
                        commit_id: commit.commit_id,
                        timestamp: commit.timestamp,
                        namespace: commit.metadata.namespace.clone(),
                    },
                );
            }
            OperationKind::Delete => {
                entries.remove(&commit.key);
            }
            OperationKind::Read => {}
        }
    }

    Snapshot::new(cutoff, entries, replayed, last_commit)
}
