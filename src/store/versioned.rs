//! VersionedStore - live item map
//!
//! Leaf component: holds current values only. It never records history and
//! never evicts; items leave only through an explicit `remove`.

use std::collections::HashMap;

use serde_json::Value;

use super::item::{Item, ItemMetadata, OperationContext};
use super::Timestamp;
use crate::access::NamespacePattern;

/// Current items keyed by string identifier.
#[derive(Debug, Clone, Default)]
pub struct VersionedStore {
    items: HashMap<String, Item>,
}

impl VersionedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from previously exported items. Later duplicates win.
    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let items = items
            .into_iter()
            .map(|item| (item.key.clone(), item))
            .collect();
        Self { items }
    }

    /// Replace the value for `key`, returning the superseded item.
    ///
    /// Version is previous + 1, or 1 when the key is not live. Identical
    /// values are not deduplicated.
    pub fn put(
        &mut self,
        key: &str,
        value: Value,
        context: &OperationContext,
        timestamp: Timestamp,
    ) -> Option<Item> {
        let version = self.items.get(key).map_or(1, |item| item.version() + 1);
        let item = Item {
            key: key.to_string(),
            value,
            metadata: ItemMetadata {
                source_id: context.actor_id.clone(),
                source_namespace: context.namespace.clone(),
                timestamp,
                version,
                tags: context.tags.clone(),
            },
        };
        self.items.insert(key.to_string(), item)
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Item> {
        self.items.get(key)
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Item> {
        self.items.remove(key)
    }

    /// Live items whose namespace matches `pattern`, ordered by key.
    pub fn query(&self, pattern: &NamespacePattern) -> Vec<&Item> {
        let mut matched: Vec<&Item> = self
            .items
            .values()
            .filter(|item| item.namespace().is_some_and(|ns| pattern.matches(ns)))
            .collect();
        matched.sort_by(|a, b| a.key.cmp(&b.key));
        matched
    }

    /// Live keys in lexicographic order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.items.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// All live items, ordered by key.
    pub fn items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
