//! Access evaluation
//!
//! Rules, first match wins:
//! 1. no Permission Set for the actor -> allow
//! 2. key not live -> allow
//! 3. key in the operation's allow-list -> allow
//! 4. item namespace matches an allow-pattern for the operation -> allow
//! 5. key in the deny-list -> deny
//! 6. otherwise -> deny

use std::collections::BTreeMap;

use super::{Operation, PermissionSet};
use crate::store::Item;

/// Which rule decided an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Unrestricted,
    KeyAbsent,
    AllowedKey,
    AllowedNamespace,
    DeniedKey,
    DefaultDeny,
}

impl AccessDecision {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessDecision::DeniedKey | AccessDecision::DefaultDeny)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessDecision::Unrestricted => "unrestricted",
            AccessDecision::KeyAbsent => "key_absent",
            AccessDecision::AllowedKey => "allowed_key",
            AccessDecision::AllowedNamespace => "allowed_namespace",
            AccessDecision::DeniedKey => "denied_key",
            AccessDecision::DefaultDeny => "default_deny",
        }
    }
}

/// Identity-to-permission registry owned by one store instance.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    permissions: BTreeMap<String, PermissionSet>,
}

impl AccessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_permissions(permissions: BTreeMap<String, PermissionSet>) -> Self {
        Self { permissions }
    }

    /// Register (or replace) the set for `actor_id`. Returns the previous set.
    pub fn register(
        &mut self,
        actor_id: impl Into<String>,
        set: PermissionSet,
    ) -> Option<PermissionSet> {
        self.permissions.insert(actor_id.into(), set)
    }

    /// Remove enforcement for `actor_id`.
    pub fn revoke(&mut self, actor_id: &str) -> Option<PermissionSet> {
        self.permissions.remove(actor_id)
    }

    pub fn get(&self, actor_id: &str) -> Option<&PermissionSet> {
        self.permissions.get(actor_id)
    }

    pub fn permissions(&self) -> &BTreeMap<String, PermissionSet> {
        &self.permissions
    }

    /// Evaluate access of `actor_id` to `key`, given its live item if any.
    pub fn evaluate(
        &self,
        actor_id: &str,
        key: &str,
        item: Option<&Item>,
        operation: Operation,
    ) -> AccessDecision {
        let Some(set) = self.permissions.get(actor_id) else {
            return AccessDecision::Unrestricted;
        };
        let Some(item) = item else {
            return AccessDecision::KeyAbsent;
        };
        if set.allowed_keys(operation).contains(key) {
            return AccessDecision::AllowedKey;
        }
        if let Some(namespace) = item.namespace() {
            if set
                .allowed_patterns(operation)
                .iter()
                .any(|p| p.matches(namespace))
            {
                return AccessDecision::AllowedNamespace;
            }
        }
        if set.denied_keys.contains(key) {
            return AccessDecision::DeniedKey;
        }
        AccessDecision::DefaultDeny
    }

    pub fn check(&self, actor_id: &str, key: &str, item: Option<&Item>, operation: Operation) -> bool {
        self.evaluate(actor_id, key, item, operation).is_allowed()
    }
}
