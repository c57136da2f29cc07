//! The filtered, sorted item sequence backing the card grid.
//!
//! An [`ItemStore`] is replaced wholesale on every directory load and rebuilt
//! from the raw listing whenever the filter or sort changes; it is never
//! partially patched. Layout and selection both read item order from here.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::MediaItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Date,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Active filter. Folders always pass, whatever the filter says, so
/// navigation never disappears under a narrow filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ItemFilter {
    #[default]
    None,
    /// Case-insensitive substring match on the file name.
    Filename(String),
    /// Comma-separated tag list; an item matches if it carries any of them.
    Tags(String),
    /// Minimum rating, inclusive. Zero matches everything.
    MinRating(u8),
}

impl ItemFilter {
    /// Free-text filters are debounced by the gallery; discrete ones apply
    /// immediately.
    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Filename(_) | Self::Tags(_))
    }

    fn matches(&self, item: &MediaItem) -> bool {
        if item.is_folder() {
            return true;
        }
        match self {
            Self::None => true,
            Self::Filename(needle) => {
                let needle = needle.trim();
                needle.is_empty()
                    || item.name.to_lowercase().contains(&needle.to_lowercase())
            }
            Self::Tags(list) => {
                let wanted: Vec<String> = list
                    .split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect();
                if wanted.is_empty() {
                    return true;
                }
                item.tags
                    .iter()
                    .any(|t| wanted.contains(&t.to_lowercase()))
            }
            Self::MinRating(min) => *min == 0 || item.rating >= *min,
        }
    }
}

/// Ordered collection of the items currently shown in the grid.
#[derive(Debug, Default)]
pub struct ItemStore {
    items: Vec<MediaItem>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the store from a raw listing: filter, then sort with folders
    /// always ahead of files regardless of the active sort field.
    pub fn build(raw: &[MediaItem], filter: &ItemFilter, by: SortField, order: SortOrder) -> Self {
        let mut items: Vec<MediaItem> = raw
            .iter()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();

        items.sort_by(|a, b| compare_items(a, b, by, order));

        Self { items }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    /// Index of the item with the given key in the current order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }

    pub fn by_key(&self, key: &str) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn by_key_mut(&mut self, key: &str) -> Option<&mut MediaItem> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }
}

fn compare_items(a: &MediaItem, b: &MediaItem, by: SortField, order: SortOrder) -> Ordering {
    // Folders first, independent of sort field and direction.
    match (a.is_folder(), b.is_folder()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    let cmp = match by {
        SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortField::Date => a.mtime.total_cmp(&b.mtime),
        SortField::Rating => a.rating.cmp(&b.rating),
    };

    match order {
        SortOrder::Asc => cmp,
        SortOrder::Desc => cmp.reverse(),
    }
}
