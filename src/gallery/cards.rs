//! The rendered-card pool and its reconciler.
//!
//! Card slots live in an arena indexed by a stable integer handle, with a
//! key→handle map on the side. Reconciliation syncs the pool against the
//! current visible set: slots are created on first visibility, removed on
//! loss of visibility, and merely repositioned while they stay visible.
//! Content fields (thumbnail URL, name, rating, tags) are captured once at
//! creation; a data mutation invalidates exactly that key so the next
//! reconcile recreates the card. Repositioning happens every scroll frame,
//! recreation only on explicit user edits.

use std::collections::{HashMap, HashSet};

use crate::layout::LayoutEntry;
use crate::models::{ItemKind, MediaItem};

pub type SlotHandle = u32;

/// One live card.
#[derive(Debug, Clone)]
pub struct CardSlot {
    // Identity and content, fixed at creation.
    pub key: String,
    pub kind: ItemKind,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub rating: u8,
    pub tags: Vec<String>,
    pub has_workflow: bool,
    // Per-frame attributes, refreshed on every reconcile.
    pub entry: LayoutEntry,
    pub item_index: usize,
    pub selected: bool,
    pub editing: bool,
}

/// What the reconciler was asked to make visible for one item.
#[derive(Debug)]
pub struct VisibleCard<'a> {
    pub item: &'a MediaItem,
    pub index: usize,
    pub entry: LayoutEntry,
    pub selected: bool,
    pub editing: bool,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: Vec<SlotHandle>,
    pub retained: Vec<SlotHandle>,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct CardPool {
    slots: Vec<Option<CardSlot>>,
    free: Vec<SlotHandle>,
    by_key: HashMap<String, SlotHandle>,
}

impl CardPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn get(&self, handle: SlotHandle) -> Option<&CardSlot> {
        self.slots.get(handle as usize)?.as_ref()
    }

    pub fn handle_for(&self, key: &str) -> Option<SlotHandle> {
        self.by_key.get(key).copied()
    }

    pub fn slots(&self) -> impl Iterator<Item = (SlotHandle, &CardSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (i as SlotHandle, s)))
    }

    /// Syncs the pool with the visible set.
    ///
    /// Idempotent: a second call with the same visible set creates and
    /// removes nothing.
    pub fn reconcile(&mut self, visible: &[VisibleCard<'_>]) -> ReconcileOutcome {
        let visible_keys: HashSet<&str> =
            visible.iter().map(|card| card.item.key()).collect();

        let mut outcome = ReconcileOutcome::default();

        // Remove cards whose item left the visible window.
        let stale: Vec<String> = self
            .by_key
            .keys()
            .filter(|key| !visible_keys.contains(key.as_str()))
            .cloned()
            .collect();
        for key in stale {
            self.remove_key(&key);
            outcome.removed += 1;
        }

        for card in visible {
            let key = card.item.key();
            match self.by_key.get(key).copied() {
                Some(handle) => {
                    // Retained: cheap attribute refresh only, never content.
                    let slot = self.slots[handle as usize]
                        .as_mut()
                        .expect("live handle in by_key");
                    slot.entry = card.entry;
                    slot.item_index = card.index;
                    slot.selected = card.selected;
                    slot.editing = card.editing;
                    outcome.retained.push(handle);
                }
                None => {
                    let handle = self.insert(CardSlot {
                        key: key.to_string(),
                        kind: card.item.kind,
                        name: card.item.name.clone(),
                        thumbnail_url: card.thumbnail_url.clone(),
                        rating: card.item.rating,
                        tags: card.item.tags.iter().cloned().collect(),
                        has_workflow: card.item.has_workflow,
                        entry: card.entry,
                        item_index: card.index,
                        selected: card.selected,
                        editing: card.editing,
                    });
                    outcome.created.push(handle);
                }
            }
        }

        outcome
    }

    /// Drops one card so the next reconcile rebuilds it with fresh content.
    /// Called after a rating or tag mutation on that item.
    pub fn invalidate(&mut self, key: &str) -> bool {
        if self.by_key.contains_key(key) {
            self.remove_key(key);
            true
        } else {
            false
        }
    }

    /// Drops every card. Used when settings change card content wholesale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.by_key.clear();
    }

    fn insert(&mut self, slot: CardSlot) -> SlotHandle {
        let key = slot.key.clone();
        let handle = match self.free.pop() {
            Some(handle) => {
                self.slots[handle as usize] = Some(slot);
                handle
            }
            None => {
                self.slots.push(Some(slot));
                (self.slots.len() - 1) as SlotHandle
            }
        };
        self.by_key.insert(key, handle);
        handle
    }

    fn remove_key(&mut self, key: &str) {
        if let Some(handle) = self.by_key.remove(key) {
            self.slots[handle as usize] = None;
            self.free.push(handle);
        }
    }
}
