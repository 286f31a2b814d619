//! Commit notification hooks
//!
//! An explicit, ordered callback list. Emission is synchronous; a failing
//! or panicking callback is logged and counted, never propagated.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::Commit;
use crate::observability::{log_event, Event, StoreMetrics};

/// Error a hook may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked once per commit, in registration order.
pub type CommitCallback = Box<dyn FnMut(&Commit) -> Result<(), HookError>>;

/// Handle for removing a registered hook.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// Ordered registry of commit callbacks.
#[derive(Default)]
pub struct CommitHooks {
    hooks: Vec<(HookId, CommitCallback)>,
    next_id: u64,
}

impl fmt::Debug for CommitHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitHooks")
            .field("registered", &self.hooks.len())
            .finish()
    }
}

impl CommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: CommitCallback) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.push((id, callback));
        id
    }

    /// Returns false when `id` was not registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _)| *hook_id != id);
        self.hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Invoke every hook with `commit`. Returns the number of failures.
    pub fn emit(&mut self, commit: &Commit, store_id: &str, metrics: &StoreMetrics) -> usize {
        let mut failures = 0;
        for (id, callback) in self.hooks.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(commit)));
            let reason = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };
            failures += 1;
            metrics.increment_hook_failures();
            log_event(
                Event::HookFailed,
                &[
                    ("store_id", store_id),
                    ("hook_id", &id.to_string()),
                    ("commit_id", &commit.commit_id.to_string()),
                    ("reason", &reason),
                ],
            );
        }
        failures
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
