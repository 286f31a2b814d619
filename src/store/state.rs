//! StateStore - the facade owned by one workflow run
//!
//! Ties the live item map, the commit log, access control and commit hooks
//! together. Every write, read and delete appends exactly one commit; a
//! denied operation appends none.
//!
//! Not internally synchronized: callers serialize operations on an instance.

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use uuid::Uuid;

use super::clock::{Clock, SystemClock, Timestamp};
use super::config::StoreConfig;
use super::errors::{StoreError, StoreResult};
use super::item::{Item, OperationContext};
use super::versioned::VersionedStore;
use crate::access::{AccessControl, NamespacePattern, Operation, PermissionSet};
use crate::history::{
    Commit, CommitCallback, CommitHooks, CommitId, CommitLog, CommitMetadata, HookError, HookId,
    OperationKind, PendingCommit, RecordedValue, RetentionPolicy, RetentionStats,
};
use crate::namespace;
use crate::observability::{log_event, Event, MetricsSnapshot, StoreMetrics};
use crate::persist;
use crate::snapshot::{Snapshot, SnapshotEngine};

/// Shared workflow state with audited history.
pub struct StateStore {
    store_id: Uuid,
    config: StoreConfig,
    items: VersionedStore,
    log: CommitLog,
    access: AccessControl,
    hooks: CommitHooks,
    metrics: StoreMetrics,
    clock: Box<dyn Clock>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("store_id", &self.store_id)
            .field("items", &self.items.len())
            .field("commits", &self.log.len())
            .field("identities", &self.access.permissions().len())
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl StateStore {
    /// Create an empty store. Fails when `config` does not validate.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::from_parts(
            config,
            VersionedStore::new(),
            None,
            AccessControl::new(),
        )?;
        log_event(
            Event::StoreCreated,
            &[
                ("store_id", &store.store_id.to_string()),
                ("strict_access", bool_str(store.config.strict_access_mode)),
                ("max_commit_count", &store.config.max_commit_count.to_string()),
                ("max_history_bytes", &store.config.max_history_bytes.to_string()),
            ],
        );
        Ok(store)
    }

    /// Assemble a store from restored parts. `log` is built with the
    /// configured policy when absent.
    pub(crate) fn from_parts(
        config: StoreConfig,
        items: VersionedStore,
        log: Option<CommitLog>,
        access: AccessControl,
    ) -> StoreResult<Self> {
        config.validate()?;
        let log = log.unwrap_or_else(|| CommitLog::new(RetentionPolicy::from_config(&config)));
        Ok(Self {
            store_id: Uuid::new_v4(),
            config,
            items,
            log,
            access,
            hooks: CommitHooks::new(),
            metrics: StoreMetrics::new(),
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store_id(&self) -> Uuid {
        self.store_id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ==================
    // Versioned store
    // ==================

    /// Store `value` as the current item for `key`.
    ///
    /// In lenient mode a denied write is logged and dropped.
    pub fn write(&mut self, key: &str, value: Value, context: &OperationContext) -> StoreResult<()> {
        validate_context(context)?;
        if !self.authorize(key, &context.actor_id, Operation::Write)? {
            return Ok(());
        }
        self.apply_write(key, value, context);
        Ok(())
    }

    /// Create-only write. Fails with `DuplicateKeyOnStrictCreate` when `key`
    /// is live.
    pub fn create(&mut self, key: &str, value: Value, context: &OperationContext) -> StoreResult<()> {
        validate_context(context)?;
        if !self.authorize(key, &context.actor_id, Operation::Write)? {
            return Ok(());
        }
        if self.items.contains_key(key) {
            return Err(StoreError::DuplicateKeyOnStrictCreate {
                key: key.to_string(),
            });
        }
        self.apply_write(key, value, context);
        Ok(())
    }

    /// Current value of `key`, or `None` when it is not live.
    ///
    /// In lenient mode a denied read also yields `None`.
    pub fn read(&mut self, key: &str, actor_id: &str) -> StoreResult<Option<Value>> {
        if !self.authorize(key, actor_id, Operation::Read)? {
            return Ok(None);
        }
        let found = self.items.get(key).map(|item| item.value.clone());
        let pending = PendingCommit::read(
            actor_id,
            key,
            found.as_ref(),
            self.config.summary_max_chars,
        );
        let now = self.clock.now();
        let commit_id = self.append(pending, now);
        self.metrics.increment_reads();

        let event = if found.is_some() {
            Event::ItemRead
        } else {
            Event::ItemMissing
        };
        log_event(
            event,
            &[
                ("store_id", &self.store_id.to_string()),
                ("actor_id", actor_id),
                ("key", key),
                ("commit_id", &commit_id.to_string()),
            ],
        );
        Ok(found)
    }

    /// Like [`read`](Self::read), but a missing key is an error.
    pub fn read_required(&mut self, key: &str, actor_id: &str) -> StoreResult<Value> {
        self.read(key, actor_id)?.ok_or_else(|| StoreError::KeyNotFound {
            key: key.to_string(),
        })
    }

    /// Remove the live item for `key`. Returns whether one was removed.
    ///
    /// Checked as a write. In lenient mode a denied delete returns false.
    pub fn delete(&mut self, key: &str, actor_id: &str) -> StoreResult<bool> {
        if !self.authorize(key, actor_id, Operation::Write)? {
            return Ok(false);
        }
        let removed = self.items.remove(key);
        let metadata = CommitMetadata {
            namespace: removed
                .as_ref()
                .and_then(|item| item.metadata.source_namespace.clone()),
            version: None,
            tags: Default::default(),
        };
        let pending = PendingCommit::delete(
            actor_id,
            key,
            removed.as_ref().map(|item| &item.value),
            self.config.per_value_size_limit,
            self.config.summary_max_chars,
            metadata,
        );
        let now = self.clock.now();
        let commit_id = self.append(pending, now);
        self.metrics.increment_deletes();

        log_event(
            Event::ItemDeleted,
            &[
                ("store_id", &self.store_id.to_string()),
                ("actor_id", actor_id),
                ("key", key),
                ("removed", bool_str(removed.is_some())),
                ("commit_id", &commit_id.to_string()),
            ],
        );
        Ok(removed.is_some())
    }

    /// Live item with metadata. Not audited and not access checked.
    pub fn get_item(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Live keys in lexicographic order.
    pub fn keys(&self) -> Vec<&str> {
        self.items.keys()
    }

    /// Live items ordered by key.
    pub fn items(&self) -> Vec<&Item> {
        self.items.items()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Live items whose namespace matches `pattern`, ordered by key.
    pub fn query_by_namespace(&self, pattern: &str) -> StoreResult<Vec<&Item>> {
        let pattern = NamespacePattern::parse(pattern)?;
        Ok(self.items.query(&pattern))
    }

    // ==================
    // Access control
    // ==================

    /// Whether `actor_id` may perform `operation` on `key` right now.
    pub fn check_access(&self, key: &str, actor_id: &str, operation: Operation) -> bool {
        self.access
            .check(actor_id, key, self.items.get(key), operation)
    }

    /// Register (or replace) the permission set of `actor_id`.
    pub fn register_permissions(
        &mut self,
        actor_id: impl Into<String>,
        set: PermissionSet,
    ) -> Option<PermissionSet> {
        self.access.register(actor_id, set)
    }

    /// Drop enforcement for `actor_id`.
    pub fn revoke_permissions(&mut self, actor_id: &str) -> Option<PermissionSet> {
        self.access.revoke(actor_id)
    }

    pub fn permissions(&self, actor_id: &str) -> Option<&PermissionSet> {
        self.access.get(actor_id)
    }

    pub(crate) fn access(&self) -> &AccessControl {
        &self.access
    }

    // ==================
    // Commit log
    // ==================

    /// Retained commits touching `key`, oldest first.
    pub fn commits_for_key<'a>(
        &'a self,
        key: &'a str,
    ) -> impl Iterator<Item = &'a Commit> + Clone + 'a {
        self.log.commits_for_key(key)
    }

    /// Retained commits at or after `timestamp`, oldest first.
    pub fn commits_since(&self, timestamp: Timestamp) -> impl Iterator<Item = &Commit> + Clone + '_ {
        self.log.commits_since(timestamp)
    }

    /// Retained commits by `actor_id`, oldest first.
    pub fn commits_by_actor<'a>(
        &'a self,
        actor_id: &'a str,
    ) -> impl Iterator<Item = &'a Commit> + Clone + 'a {
        self.log.commits_by_actor(actor_id)
    }

    /// Retained commits of one operation kind, oldest first.
    pub fn commits_of_kind(&self, kind: OperationKind) -> impl Iterator<Item = &Commit> + Clone + '_ {
        self.log.commits_of_kind(kind)
    }

    /// Every retained commit, oldest first.
    pub fn commits(&self) -> impl DoubleEndedIterator<Item = &Commit> + ExactSizeIterator + Clone {
        self.log.iter()
    }

    pub fn commit(&self, commit_id: CommitId) -> Option<&Commit> {
        self.log.get(commit_id)
    }

    pub fn retention_stats(&self) -> RetentionStats {
        self.log.stats()
    }

    pub(crate) fn log(&self) -> &CommitLog {
        &self.log
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Subscribe to every future commit. Callbacks run synchronously in
    /// registration order; their failures are logged and never propagate.
    pub fn on_commit<F>(&mut self, callback: F) -> HookId
    where
        F: FnMut(&Commit) -> Result<(), HookError> + 'static,
    {
        let callback: CommitCallback = Box::new(callback);
        self.hooks.register(callback)
    }

    /// Returns false when `id` is not registered.
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    // ==================
    // Snapshots
    // ==================

    /// State as of `timestamp`, inclusive.
    pub fn snapshot_at(&self, timestamp: Timestamp) -> StoreResult<Snapshot> {
        let snapshot = SnapshotEngine::new(&self.log).at(timestamp)?;
        self.record_snapshot(&snapshot, "timestamp");
        Ok(snapshot)
    }

    /// State after `commit_id`, inclusive.
    pub fn snapshot_at_commit(&self, commit_id: CommitId) -> StoreResult<Snapshot> {
        let snapshot = SnapshotEngine::new(&self.log).at_commit(commit_id)?;
        self.record_snapshot(&snapshot, "commit");
        Ok(snapshot)
    }

    /// State just before `actor_id`'s first retained commit.
    pub fn snapshot_before_actor(&self, actor_id: &str) -> StoreResult<Snapshot> {
        let snapshot = SnapshotEngine::new(&self.log).before_actor(actor_id)?;
        self.record_snapshot(&snapshot, "before_actor");
        Ok(snapshot)
    }

    fn record_snapshot(&self, snapshot: &Snapshot, cutoff_kind: &str) {
        self.metrics.increment_snapshots();
        log_event(
            Event::SnapshotReplayed,
            &[
                ("store_id", &self.store_id.to_string()),
                ("cutoff", cutoff_kind),
                ("replayed_commits", &snapshot.replayed_commits().to_string()),
                ("keys", &snapshot.len().to_string()),
            ],
        );
    }

    // ==================
    // Persistence
    // ==================

    /// Encode items, retained commits and permissions.
    pub fn serialize(&self) -> StoreResult<Vec<u8>> {
        persist::encode(self)
    }

    /// Rebuild a store from [`serialize`](Self::serialize) output, applying
    /// `config`'s retention policy to the restored log.
    pub fn deserialize(bytes: &[u8], config: StoreConfig) -> StoreResult<Self> {
        let image = persist::decode(bytes)?;
        let policy = RetentionPolicy::from_config(&config);
        let (log, evicted) = CommitLog::restore(
            policy,
            image.commits,
            image.next_commit_id,
            image.evicted_commits,
        )?;
        let store = Self::from_parts(
            config,
            VersionedStore::from_items(image.items),
            Some(log),
            AccessControl::from_permissions(image.permissions),
        )?;

        let store_id = store.store_id.to_string();
        log_event(
            Event::StoreRestored,
            &[
                ("store_id", &store_id),
                ("items", &store.items.len().to_string()),
                ("commits", &store.log.len().to_string()),
            ],
        );
        if evicted > 0 {
            store.metrics.add_evicted(evicted as u64);
            log_event(
                Event::RetentionEvicted,
                &[
                    ("store_id", &store_id),
                    ("evicted", &evicted.to_string()),
                    ("retained_commits", &store.log.len().to_string()),
                    ("retained_bytes", &store.log.retained_bytes().to_string()),
                ],
            );
        }
        Ok(store)
    }

    /// Write the serialized store to `path` through a synced temp file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let bytes = self.serialize()?;
        let tmp = temp_path(path);
        let mut file = File::create(&tmp).map_err(|e| io_error("create", &tmp, e))?;
        file.write_all(&bytes)
            .map_err(|e| io_error("write", &tmp, e))?;
        file.sync_all().map_err(|e| io_error("fsync", &tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| io_error("rename", path, e))?;
        Ok(())
    }

    /// Load a store previously written by [`save`](Self::save).
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        let bytes = fs::read(path).map_err(|e| io_error("read", path, e))?;
        Self::deserialize(&bytes, config)
    }

    // ==================
    // Internals
    // ==================

    /// Evaluate access. `Ok(false)` is a lenient-mode denial.
    fn authorize(&self, key: &str, actor_id: &str, operation: Operation) -> StoreResult<bool> {
        let decision = self
            .access
            .evaluate(actor_id, key, self.items.get(key), operation);
        if decision.is_allowed() {
            return Ok(true);
        }

        self.metrics.increment_denials();
        log_event(
            Event::AccessDenied,
            &[
                ("store_id", &self.store_id.to_string()),
                ("actor_id", actor_id),
                ("key", key),
                ("operation", operation.as_str()),
                ("rule", decision.as_str()),
                ("strict", bool_str(self.config.strict_access_mode)),
            ],
        );
        if self.config.strict_access_mode {
            return Err(StoreError::AccessDenied {
                actor_id: actor_id.to_string(),
                key: key.to_string(),
                operation,
            });
        }
        Ok(false)
    }

    fn apply_write(&mut self, key: &str, value: Value, context: &OperationContext) {
        let timestamp = self.log.clamp_timestamp(self.clock.now());
        let previous = self.items.get(key);
        let version = previous.map_or(1, |item| item.version() + 1);
        let pending = PendingCommit::write(
            &context.actor_id,
            key,
            previous.map(|item| &item.value),
            &value,
            self.config.per_value_size_limit,
            self.config.summary_max_chars,
            CommitMetadata {
                namespace: context.namespace.clone(),
                version: Some(version),
                tags: context.tags.clone(),
            },
        );
        let stubbed = pending
            .new_value
            .as_ref()
            .is_some_and(RecordedValue::is_reference);

        self.items.put(key, value, context, timestamp);
        let commit_id = self.append(pending, timestamp);
        self.metrics.increment_writes();

        let store_id = self.store_id.to_string();
        if stubbed {
            self.metrics.increment_stubbed();
            log_event(
                Event::ValueStubbed,
                &[
                    ("store_id", &store_id),
                    ("key", key),
                    ("limit", &self.config.per_value_size_limit.to_string()),
                ],
            );
        }
        log_event(
            Event::ItemWritten,
            &[
                ("store_id", &store_id),
                ("actor_id", &context.actor_id),
                ("key", key),
                ("version", &version.to_string()),
                ("commit_id", &commit_id.to_string()),
            ],
        );
    }

    /// Append one commit, notify hooks, then log any eviction.
    fn append(&mut self, pending: PendingCommit, now: Timestamp) -> CommitId {
        let store_id = self.store_id.to_string();
        let hooks = &mut self.hooks;
        let metrics = &self.metrics;
        let report = self.log.append_with(pending, now, |commit| {
            hooks.emit(commit, &store_id, metrics);
        });

        if report.evicted > 0 {
            self.metrics.add_evicted(report.evicted as u64);
            log_event(
                Event::RetentionEvicted,
                &[
                    ("store_id", &store_id),
                    ("evicted", &report.evicted.to_string()),
                    ("retained_commits", &self.log.len().to_string()),
                    ("retained_bytes", &report.retained_bytes.to_string()),
                ],
            );
        }
        report.commit_id
    }
}

fn validate_context(context: &OperationContext) -> StoreResult<()> {
    match &context.namespace {
        Some(ns) => namespace::validate(ns),
        None => Ok(()),
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// `state.json` becomes `state.json.tmp`, so no sibling is clobbered.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io(format!("{} {} failed: {}", action, path.display(), e))
}
