//! Remembered aspect ratios.
//!
//! Thumbnails report their natural dimensions as they load. Ratios are kept
//! in an LRU cache keyed by item key so a directory revisit starts from the
//! real ratios instead of the square default, avoiding a second masonry
//! relayout pass.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::models::MediaItem;

const RATIO_CACHE_CAPACITY: usize = 4096;

pub struct RatioCache {
    cache: LruCache<String, f32>,
}

impl RatioCache {
    pub fn new() -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(RATIO_CACHE_CAPACITY).unwrap()),
        }
    }

    /// Records a freshly measured ratio. Nonsensical values are dropped.
    pub fn record(&mut self, key: &str, ratio: f32) {
        if !ratio.is_finite() || ratio <= 0.0 {
            return;
        }
        self.cache.put(key.to_string(), ratio);
    }

    pub fn get(&mut self, key: &str) -> Option<f32> {
        self.cache.get(key).copied()
    }

    /// Fills in `aspect_ratio` for every item whose ratio is already known.
    pub fn apply_to(&mut self, items: &mut [MediaItem]) {
        for item in items {
            if item.aspect_ratio.is_none() {
                if let Some(ratio) = self.cache.get(item.key()).copied() {
                    item.aspect_ratio = Some(ratio);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for RatioCache {
    fn default() -> Self {
        Self::new()
    }
}
