//! Tag-editing state.
//!
//! Tracks which items currently have the tag editor open. Tag mutations
//! apply to every member independently; the editor surface shows the
//! intersection of tags across all members ("common tags").

use std::collections::{BTreeSet, HashSet};

use crate::models::ItemStore;

#[derive(Debug, Default)]
pub struct EditState {
    keys: HashSet<String>,
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Opens or closes the editor for one item.
    ///
    /// Without multi-select, editing an already-sole-edited item closes the
    /// editor; anything else makes the set exactly `{key}`. With
    /// multi-select, the key toggles independently of the others.
    pub fn toggle(&mut self, key: &str, multi_select: bool) {
        if multi_select {
            if !self.keys.remove(key) {
                self.keys.insert(key.to_string());
            }
        } else if self.keys.len() == 1 && self.keys.contains(key) {
            self.keys.clear();
        } else {
            self.keys.clear();
            self.keys.insert(key.to_string());
        }
    }

    /// Replaces the set with the given keys. Used by batch tagging to seed
    /// the editor with the whole selection at once.
    pub fn seed<'a>(&mut self, keys: impl Iterator<Item = &'a str>) {
        self.keys = keys.map(str::to_string).collect();
    }

    pub fn prune(&mut self, store: &ItemStore) {
        self.keys.retain(|key| store.contains(key));
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Intersection of tags across all edited items present in the store.
    ///
    /// A singleton set yields all of that item's tags; an empty set yields
    /// no tags.
    pub fn common_tags(&self, store: &ItemStore) -> BTreeSet<String> {
        let mut common: Option<BTreeSet<String>> = None;
        for key in &self.keys {
            let Some(item) = store.by_key(key) else {
                continue;
            };
            common = Some(match common {
                None => item.tags.clone(),
                Some(acc) => acc.intersection(&item.tags).cloned().collect(),
            });
        }
        common.unwrap_or_default()
    }
}
