//! # Permission Sets
//!
//! Per-identity allow/deny lists. An identity without a set is unrestricted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{NamespacePattern, Operation};
use crate::store::StoreResult;

/// Read/write grants for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(default)]
    pub allowed_read_keys: BTreeSet<String>,
    #[serde(default)]
    pub allowed_write_keys: BTreeSet<String>,
    #[serde(default)]
    pub denied_keys: BTreeSet<String>,
    #[serde(default)]
    pub allowed_read_namespace_patterns: Vec<NamespacePattern>,
    #[serde(default)]
    pub allowed_write_namespace_patterns: Vec<NamespacePattern>,
}

impl PermissionSet {
    /// An empty set: once registered, it denies everything that exists.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_read_key(mut self, key: impl Into<String>) -> Self {
        self.allowed_read_keys.insert(key.into());
        self
    }

    pub fn allow_write_key(mut self, key: impl Into<String>) -> Self {
        self.allowed_write_keys.insert(key.into());
        self
    }

    pub fn deny_key(mut self, key: impl Into<String>) -> Self {
        self.denied_keys.insert(key.into());
        self
    }

    /// Fails with `InvalidPattern` on a malformed glob.
    pub fn allow_read_namespace(mut self, pattern: &str) -> StoreResult<Self> {
        self.allowed_read_namespace_patterns
            .push(NamespacePattern::parse(pattern)?);
        Ok(self)
    }

    /// Fails with `InvalidPattern` on a malformed glob.
    pub fn allow_write_namespace(mut self, pattern: &str) -> StoreResult<Self> {
        self.allowed_write_namespace_patterns
            .push(NamespacePattern::parse(pattern)?);
        Ok(self)
    }

    pub fn allowed_keys(&self, operation: Operation) -> &BTreeSet<String> {
        match operation {
            Operation::Read => &self.allowed_read_keys,
            Operation::Write => &self.allowed_write_keys,
        }
    }

    pub fn allowed_patterns(&self, operation: Operation) -> &[NamespacePattern] {
        match operation {
            Operation::Read => &self.allowed_read_namespace_patterns,
            Operation::Write => &self.allowed_write_namespace_patterns,
        }
    }
}
