use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;
use xxhash_rust::xxh3::xxh3_64;

use crate::layout::{GridLayout, PackingPolicy, SizingConfig};
use crate::models::MediaItem;

/// Width bucket size for cache keys.
/// Container widths are bucketed to avoid excessive invalidation on small resizes.
const WIDTH_BUCKET_SIZE: u32 = 50;

/// Maximum number of cached layouts to keep in memory.
const MAX_CACHE_ENTRIES: usize = 8;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    width_bucket: u32,
    config_hash: u64,
    list_hash: u64,
}

struct CachedLayout {
    layout: GridLayout,
    container_width: f32,
    item_count: usize,
    last_used: Instant,
}

/// Cache of computed layouts keyed by (width bucket, sizing config, list hash).
///
/// The list hash covers item identity, mtime and known aspect ratio in the
/// current order, so a reload, re-sort, refilter or late-arriving ratio all
/// invalidate naturally. The width bucket only bounds key cardinality; the
/// exact container width is validated on every hit, so a resize within a
/// bucket still recomputes instead of serving geometry for the old width.
/// Hits are O(1) apart from cloning the entries.
pub struct LayoutCache {
    cache: RwLock<HashMap<CacheKey, CachedLayout>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::with_capacity(MAX_CACHE_ENTRIES)),
        }
    }

    pub fn width_bucket(container_width: f32) -> u32 {
        (container_width.max(0.0) as u32) / WIDTH_BUCKET_SIZE
    }

    /// Fast hash of the item list in its current order.
    pub fn list_hash(items: &[MediaItem]) -> u64 {
        let mut input = Vec::with_capacity(items.len() * 48);
        for item in items {
            input.extend_from_slice(item.key().as_bytes());
            input.extend_from_slice(&item.mtime.to_le_bytes());
            input.extend_from_slice(&item.aspect_ratio_or_default().to_le_bytes());
        }
        xxh3_64(&input)
    }

    /// Hash of every config field that affects geometry.
    pub fn config_hash(config: &SizingConfig) -> u64 {
        let mut input = Vec::with_capacity(32);
        for value in [
            config.min_card_width,
            config.gap,
            config.edge_padding,
            config.top_padding,
            config.min_image_height,
            config.fixed_card_height,
            config.info.panel_height(),
        ] {
            input.extend_from_slice(&value.to_le_bytes());
        }
        input.push(match config.policy {
            PackingPolicy::UniformGrid => 0,
            PackingPolicy::MasonryColumns => 1,
        });
        xxh3_64(&input)
    }

    pub fn get(
        &self,
        width_bucket: u32,
        config_hash: u64,
        list_hash: u64,
        container_width: f32,
        item_count: usize,
    ) -> Option<GridLayout> {
        let key = CacheKey {
            width_bucket,
            config_hash,
            list_hash,
        };

        let mut cache = self.cache.write();
        let entry = cache.get_mut(&key)?;
        if entry.item_count != item_count || entry.container_width != container_width {
            return None;
        }
        entry.last_used = Instant::now();
        Some(entry.layout.clone())
    }

    pub fn set(
        &self,
        width_bucket: u32,
        config_hash: u64,
        list_hash: u64,
        container_width: f32,
        layout: GridLayout,
    ) {
        let key = CacheKey {
            width_bucket,
            config_hash,
            list_hash,
        };
        let entry = CachedLayout {
            item_count: layout.entries.len(),
            container_width,
            layout,
            last_used: Instant::now(),
        };

        let mut cache = self.cache.write();
        if cache.len() >= MAX_CACHE_ENTRIES && !cache.contains_key(&key) {
            Self::evict_oldest(&mut cache);
        }
        cache.insert(key, entry);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    fn evict_oldest(cache: &mut HashMap<CacheKey, CachedLayout>) {
        let oldest_key = cache
            .iter()
            .min_by_key(|(_, v)| v.last_used)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest_key {
            cache.remove(&key);
        }
    }

    /// Computes the layout through the cache.
    pub fn compute(
        &self,
        config: &SizingConfig,
        items: &[MediaItem],
        container_width: f32,
    ) -> GridLayout {
        if items.is_empty() || container_width <= 0.0 {
            return GridLayout::empty();
        }

        let width_bucket = Self::width_bucket(container_width);
        let config_hash = Self::config_hash(config);
        let list_hash = Self::list_hash(items);

        if let Some(layout) = self.get(
            width_bucket,
            config_hash,
            list_hash,
            container_width,
            items.len(),
        ) {
            return layout;
        }

        let layout = config.compute(items, container_width);
        self.set(width_bucket, config_hash, list_hash, container_width, layout.clone());
        layout
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;

    fn make_item(name: &str, mtime: f64) -> MediaItem {
        let mut item =
            MediaItem::new_media(ItemKind::Image, format!("/input/{name}"), name);
        item.mtime = mtime;
        item
    }

    #[test]
    fn test_width_bucket() {
        assert_eq!(LayoutCache::width_bucket(1920.0), 38);
        assert_eq!(LayoutCache::width_bucket(1900.0), 38);
        assert_eq!(LayoutCache::width_bucket(1950.0), 39);
        assert_eq!(LayoutCache::width_bucket(-5.0), 0);
    }

    #[test]
    fn test_list_hash_changes_on_order_and_ratio() {
        let a = make_item("a.png", 1.0);
        let b = make_item("b.png", 2.0);

        let h1 = LayoutCache::list_hash(&[a.clone(), b.clone()]);
        let h2 = LayoutCache::list_hash(&[b.clone(), a.clone()]);
        assert_ne!(h1, h2);

        let mut a_rated = a.clone();
        a_rated.aspect_ratio = Some(1.5);
        let h3 = LayoutCache::list_hash(&[a_rated, b]);
        assert_ne!(h1, h3);
    }

    #[test]
    fn test_config_hash_distinguishes_policies() {
        let grid = SizingConfig::default();
        let masonry = SizingConfig {
            policy: PackingPolicy::MasonryColumns,
            ..SizingConfig::default()
        };
        assert_ne!(
            LayoutCache::config_hash(&grid),
            LayoutCache::config_hash(&masonry)
        );
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = LayoutCache::new();
        let config = SizingConfig::default();
        let items: Vec<MediaItem> = (0..9).map(|i| make_item(&format!("{i}.png"), 1.0)).collect();

        assert!(cache.is_empty());
        let first = cache.compute(&config, &items, 800.0);
        assert_eq!(cache.len(), 1);
        let second = cache.compute(&config, &items, 800.0);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_resize_within_bucket_recomputes() {
        let cache = LayoutCache::new();
        let config = SizingConfig::default();
        let items: Vec<MediaItem> = (0..9).map(|i| make_item(&format!("{i}.png"), 1.0)).collect();
        assert_eq!(
            LayoutCache::width_bucket(800.0),
            LayoutCache::width_bucket(849.0)
        );

        let narrow = cache.compute(&config, &items, 800.0);
        let wide = cache.compute(&config, &items, 849.0);

        assert!(wide.card_width > narrow.card_width);
        assert_eq!(wide, config.compute(&items, 849.0));
    }

    #[test]
    fn test_eviction_bounds_cache() {
        let cache = LayoutCache::new();
        let layout = GridLayout::empty();
        for i in 0..(MAX_CACHE_ENTRIES + 5) {
            cache.set(i as u32, 0, i as u64, i as f32 * 50.0, layout.clone());
        }
        assert!(cache.len() <= MAX_CACHE_ENTRIES);
    }

    #[test]
    fn test_degenerate_inputs_bypass_cache() {
        let cache = LayoutCache::new();
        let config = SizingConfig::default();
        let items = vec![make_item("a.png", 1.0)];

        assert_eq!(cache.compute(&config, &[], 800.0), GridLayout::empty());
        assert_eq!(cache.compute(&config, &items, 0.0), GridLayout::empty());
        assert!(cache.is_empty());
    }
}
