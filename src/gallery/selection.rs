//! Multi-select state over the store's current order.

use std::collections::HashSet;

use crate::models::ItemStore;

/// Selected item keys. Membership is order-independent, but insertion order
/// is kept because range selection anchors on the most recently added key.
#[derive(Debug, Default)]
pub struct SelectionModel {
    order: Vec<String>,
    members: HashSet<String>,
}

impl SelectionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Adds the key if absent, removes it if present. Returns whether the
    /// key is selected afterwards.
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.members.remove(key) {
            self.order.retain(|k| k != key);
            false
        } else {
            self.members.insert(key.to_string());
            self.order.push(key.to_string());
            true
        }
    }

    /// Range selection anchored at the last added key.
    ///
    /// With an empty selection this selects just `key`. Otherwise every
    /// non-folder item in the inclusive index span between the anchor and
    /// `key` (in the store's current order) is unioned in. Idempotent for a
    /// fixed pair of endpoints.
    pub fn select_range(&mut self, store: &ItemStore, key: &str) {
        let Some(current) = store.position(key) else {
            return;
        };

        let anchor = self
            .order
            .last()
            .and_then(|last| store.position(last));

        let Some(anchor) = anchor else {
            if !self.members.contains(key) {
                self.members.insert(key.to_string());
                self.order.push(key.to_string());
            }
            return;
        };

        let (start, end) = (anchor.min(current), anchor.max(current));
        for index in start..=end {
            let Some(item) = store.get(index) else {
                continue;
            };
            if item.is_folder() {
                continue;
            }
            let item_key = item.key();
            if !self.members.contains(item_key) {
                self.members.insert(item_key.to_string());
                self.order.push(item_key.to_string());
            }
        }
    }

    /// Replaces the selection with every non-folder item in the store.
    pub fn select_all(&mut self, store: &ItemStore) {
        self.clear();
        for item in store.items() {
            if !item.is_folder() {
                self.members.insert(item.key().to_string());
                self.order.push(item.key().to_string());
            }
        }
    }

    /// Drops keys no longer present in the store. Called on every store
    /// replacement so the selection never references stale items.
    pub fn prune(&mut self, store: &ItemStore) {
        self.order.retain(|key| store.contains(key));
        self.members.retain(|key| store.contains(key));
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
