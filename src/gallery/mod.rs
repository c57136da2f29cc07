//! The gallery controller.
//!
//! [`Gallery`] owns the full pipeline from a raw directory listing to the
//! pool of rendered cards: filter and sort into an [`ItemStore`], lay the
//! store out, window the layout against the scroll position, and reconcile
//! the card pool. Synchronous inputs (scroll, resize, filter, selection)
//! mutate state directly or land in debounce slots; directory loads and
//! metadata mutations go through the async [`DirectoryProvider`].

mod cards;
mod editing;
mod events;
mod selection;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

pub use cards::{CardPool, CardSlot, ReconcileOutcome, SlotHandle, VisibleCard};
pub use editing::EditState;
pub use events::GalleryEvent;
pub use selection::SelectionModel;

use crate::debounce::{
    DebounceSlot, FILTER_WINDOW, RATIO_WINDOW, RELAYOUT_WINDOW, SCROLL_WINDOW,
};
use crate::error::{GalleryError, MutationOutcome};
use crate::layout::{
    visible_indices, GridLayout, LayoutCache, PackingPolicy, SizingConfig, DEFAULT_OVERSCAN,
};
use crate::models::{ItemFilter, ItemStore, MediaItem, RatioCache, SortField, SortOrder};
use crate::remote::{thumbnail_url, DirectoryProvider, MetadataPatch};
use crate::settings::DisplaySettings;

use events::EventSink;

/// Where the gallery stands with respect to its backing directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The last load failed; the grid shows a placeholder until the next
    /// successful navigation.
    Failed(String),
}

/// Holds the in-flight flag for the duration of one metadata mutation and
/// clears it on drop, so a cancelled mutation future cannot leave the
/// gallery permanently locked.
struct MutationGuard(Arc<AtomicBool>);

impl MutationGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, GalleryError> {
        if flag.swap(true, Ordering::AcqRel) {
            return Err(GalleryError::MutationInFlight);
        }
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Gallery<P: DirectoryProvider> {
    provider: P,
    settings: DisplaySettings,
    settings_path: Option<PathBuf>,

    raw: Vec<MediaItem>,
    store: ItemStore,
    filter: ItemFilter,
    current_directory: Option<String>,
    parent_directory: Option<String>,
    load_state: LoadState,

    layout: GridLayout,
    layout_cache: LayoutCache,
    ratios: RatioCache,
    pool: CardPool,
    selection: SelectionModel,
    editing: EditState,

    container: (f32, f32),
    scroll_top: f32,
    mutation_in_flight: Arc<AtomicBool>,

    scroll_slot: DebounceSlot<f32>,
    relayout_slot: DebounceSlot<(f32, f32)>,
    filter_slot: DebounceSlot<ItemFilter>,
    ratio_slot: DebounceSlot<()>,

    events: EventSink,
}

impl<P: DirectoryProvider> Gallery<P> {
    /// Creates a gallery with settings loaded from the platform config
    /// directory. An unresolvable config location falls back to defaults
    /// without persistence.
    pub fn new(provider: P) -> Self {
        let (settings, settings_path) = match DisplaySettings::default_path() {
            Ok(path) => (DisplaySettings::load(&path), Some(path)),
            Err(err) => {
                warn!("Settings unavailable, using defaults: {err:#}");
                (DisplaySettings::default(), None)
            }
        };
        Self::with_settings(provider, settings, settings_path)
    }

    pub fn with_settings(
        provider: P,
        settings: DisplaySettings,
        settings_path: Option<PathBuf>,
    ) -> Self {
        Self {
            provider,
            settings,
            settings_path,
            raw: Vec::new(),
            store: ItemStore::new(),
            filter: ItemFilter::None,
            current_directory: None,
            parent_directory: None,
            load_state: LoadState::Idle,
            layout: GridLayout::empty(),
            layout_cache: LayoutCache::new(),
            ratios: RatioCache::new(),
            pool: CardPool::new(),
            selection: SelectionModel::new(),
            editing: EditState::new(),
            container: (0.0, 0.0),
            scroll_top: 0.0,
            mutation_in_flight: Arc::new(AtomicBool::new(false)),
            scroll_slot: DebounceSlot::new(SCROLL_WINDOW),
            relayout_slot: DebounceSlot::new(RELAYOUT_WINDOW),
            filter_slot: DebounceSlot::new(FILTER_WINDOW),
            ratio_slot: DebounceSlot::new(RATIO_WINDOW),
            events: EventSink::new(),
        }
    }

    /// Channel the gallery pushes change notifications into.
    pub fn events(&self) -> flume::Receiver<GalleryEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    /// True while a metadata mutation awaits the backend. Embedders disable
    /// rating and tag affordances while this holds.
    pub fn mutation_in_flight(&self) -> bool {
        self.mutation_in_flight.load(Ordering::Acquire)
    }

    pub fn current_directory(&self) -> Option<&str> {
        self.current_directory.as_deref()
    }

    pub fn parent_directory(&self) -> Option<&str> {
        self.parent_directory.as_deref()
    }

    /// Live cards, in no particular order.
    pub fn cards(&self) -> impl Iterator<Item = &CardSlot> {
        self.pool.slots().map(|(_, slot)| slot)
    }

    pub fn card_count(&self) -> usize {
        self.pool.len()
    }

    pub fn is_editing(&self, key: &str) -> bool {
        self.editing.contains(key)
    }

    pub fn editing_count(&self) -> usize {
        self.editing.len()
    }

    fn sizing_config(&self) -> SizingConfig {
        SizingConfig {
            min_card_width: self.settings.thumbnail_size as f32,
            policy: self.settings.packing,
            info: self.settings.info_rows(),
            ..SizingConfig::default()
        }
    }

    // ----- directory loads -----------------------------------------------

    /// Loads a directory and replaces the store wholesale. On failure the
    /// gallery enters the placeholder state but stays navigable.
    pub async fn load_files(
        &mut self,
        directory: &str,
        force_refresh: bool,
    ) -> Result<(), GalleryError> {
        self.load_state = LoadState::Loading;
        info!("Loading directory {directory} (force_refresh={force_refresh})");

        match self.provider.list_directory(directory, force_refresh).await {
            Ok(mut listing) => {
                self.ratios.apply_to(&mut listing.items);
                self.raw = listing.items;
                self.current_directory = Some(listing.current_directory);
                self.parent_directory = listing.parent_directory;
                self.load_state = LoadState::Loaded;
                self.rebuild_store();
                Ok(())
            }
            Err(err) => {
                warn!("Directory load failed: {err}");
                self.raw.clear();
                self.store = ItemStore::new();
                self.layout = GridLayout::empty();
                self.pool.clear();
                self.selection.clear();
                self.editing.clear();
                self.load_state = LoadState::Failed(err.to_string());
                self.events.emit(GalleryEvent::LoadFailed {
                    message: err.to_string(),
                });
                self.events.emit(GalleryEvent::ItemsChanged { count: 0 });
                Err(err)
            }
        }
    }

    pub async fn navigate_to(&mut self, directory: &str) -> Result<(), GalleryError> {
        self.load_files(directory, false).await
    }

    /// Navigates to the parent directory, if the current level has one.
    pub async fn navigate_up(&mut self) -> Result<bool, GalleryError> {
        let Some(parent) = self.parent_directory.clone() else {
            return Ok(false);
        };
        self.load_files(&parent, false).await?;
        Ok(true)
    }

    /// Reloads the current directory.
    pub async fn reload(&mut self, force_refresh: bool) -> Result<(), GalleryError> {
        let Some(directory) = self.current_directory.clone() else {
            return Ok(());
        };
        self.load_files(&directory, force_refresh).await
    }

    // ----- synchronous pipeline ------------------------------------------

    /// Rebuilds the store from the raw listing, prunes stale selection and
    /// edit members, and recomputes downstream layout and cards.
    fn rebuild_store(&mut self) {
        self.store = ItemStore::build(
            &self.raw,
            &self.filter,
            self.settings.sort_by,
            self.settings.sort_order,
        );

        let before = self.selection.len();
        self.selection.prune(&self.store);
        self.editing.prune(&self.store);

        self.events.emit(GalleryEvent::ItemsChanged {
            count: self.store.len(),
        });
        if self.selection.len() != before {
            self.events.emit(GalleryEvent::SelectionChanged {
                count: self.selection.len(),
            });
        }

        self.rebuild_layout();
    }

    fn rebuild_layout(&mut self) {
        self.layout =
            self.layout_cache
                .compute(&self.sizing_config(), self.store.items(), self.container.0);
        self.update_visible();
    }

    /// Windows the layout against the scroll position and reconciles the
    /// card pool with the visible set.
    fn update_visible(&mut self) {
        let indices = visible_indices(
            &self.layout.entries,
            self.scroll_top,
            self.container.1,
            DEFAULT_OVERSCAN,
        );

        let visible: Vec<VisibleCard<'_>> = indices
            .into_iter()
            .filter_map(|index| {
                let item = self.store.get(index)?;
                let key = item.key();
                Some(VisibleCard {
                    item,
                    index,
                    entry: self.layout.entries[index],
                    selected: self.selection.contains(key),
                    editing: self.editing.contains(key),
                    thumbnail_url: item
                        .path
                        .as_deref()
                        .filter(|_| !item.is_folder())
                        .map(|path| thumbnail_url(path, item.mtime as i64)),
                })
            })
            .collect();

        let outcome = self.pool.reconcile(&visible);
        debug!(
            "Reconciled cards: {} created, {} retained, {} removed",
            outcome.created.len(),
            outcome.retained.len(),
            outcome.removed
        );
    }

    // ----- viewport inputs -----------------------------------------------

    /// Reports new container dimensions. The first measurement applies
    /// immediately; later ones wait out the resize window so mid-animation
    /// dimensions are never captured.
    pub fn set_container(&mut self, width: f32, height: f32, now: Instant) {
        if self.container == (width, height) {
            return;
        }
        if self.container == (0.0, 0.0) {
            self.container = (width, height);
            self.rebuild_layout();
        } else {
            self.relayout_slot.push((width, height), now);
        }
    }

    pub fn set_scroll_top(&mut self, scroll_top: f32, now: Instant) {
        self.scroll_slot.push(scroll_top, now);
    }

    /// Applies a filter. Free-text filters are debounced per keystroke;
    /// discrete ones apply immediately.
    pub fn set_filter(&mut self, filter: ItemFilter, now: Instant) {
        if filter.is_free_text() {
            self.filter_slot.push(filter, now);
        } else {
            self.filter_slot.take();
            self.filter = filter;
            self.rebuild_store();
        }
    }

    pub fn set_sort(&mut self, by: SortField, order: SortOrder) {
        self.settings.sort_by = by;
        self.settings.sort_order = order;
        self.persist_settings();
        self.rebuild_store();
    }

    /// Applies a settings change, persists it and rebuilds everything that
    /// depends on it. Card content may change wholesale, so the pool is
    /// flushed rather than invalidated key by key.
    pub fn update_settings(&mut self, mutate: impl FnOnce(&mut DisplaySettings)) {
        mutate(&mut self.settings);
        self.persist_settings();
        self.pool.clear();
        self.rebuild_store();
    }

    fn persist_settings(&self) {
        if let Some(path) = &self.settings_path {
            if let Err(err) = self.settings.save(path) {
                warn!("Failed to persist settings: {err:#}");
            }
        }
    }

    /// Drains every due debounce slot, heaviest recompute first so a due
    /// scroll never runs against a layout about to be replaced.
    pub fn poll_deferred(&mut self, now: Instant) {
        if let Some(filter) = self.filter_slot.poll(now) {
            self.filter = filter;
            self.rebuild_store();
        }
        if let Some((width, height)) = self.relayout_slot.poll(now) {
            self.container = (width, height);
            // The full relayout subsumes any pending ratio-driven one.
            self.ratio_slot.take();
            self.rebuild_layout();
        }
        if self.ratio_slot.poll(now).is_some() {
            self.rebuild_layout();
        }
        if let Some(scroll_top) = self.scroll_slot.poll(now) {
            self.scroll_top = scroll_top;
            self.update_visible();
        }
    }

    /// Earliest instant any deferred work becomes due. Lets the embedder
    /// sleep instead of polling.
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.filter_slot.deadline(),
            self.relayout_slot.deadline(),
            self.ratio_slot.deadline(),
            self.scroll_slot.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Records the natural aspect ratio a thumbnail reported. Only the
    /// masonry policy relayouts for this, after the ratio burst settles.
    pub fn note_aspect_ratio(&mut self, key: &str, ratio: f32, now: Instant) {
        self.ratios.record(key, ratio);
        if !ratio.is_finite() || ratio <= 0.0 {
            return;
        }
        for item in self.raw.iter_mut().filter(|i| i.key() == key) {
            item.aspect_ratio = Some(ratio);
        }
        if let Some(item) = self.store.by_key_mut(key) {
            item.aspect_ratio = Some(ratio);
        }
        if self.settings.packing == PackingPolicy::MasonryColumns {
            self.ratio_slot.push((), now);
        }
    }

    // ----- selection and editing -----------------------------------------

    /// Toggles selection of one item. Folders are not selectable.
    pub fn toggle_select(&mut self, key: &str) {
        let Some(item) = self.store.by_key(key) else {
            return;
        };
        if item.is_folder() {
            return;
        }
        self.selection.toggle(key);
        self.emit_selection_changed();
        self.update_visible();
    }

    /// Range selection anchored at the most recently selected item.
    pub fn select_range(&mut self, key: &str) {
        self.selection.select_range(&self.store, key);
        self.emit_selection_changed();
        self.update_visible();
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.store);
        self.emit_selection_changed();
        self.update_visible();
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.emit_selection_changed();
        self.update_visible();
    }

    fn emit_selection_changed(&self) {
        self.events.emit(GalleryEvent::SelectionChanged {
            count: self.selection.len(),
        });
    }

    /// Opens or closes the tag editor for one item.
    pub fn toggle_editing(&mut self, key: &str, multi_select: bool) {
        let Some(item) = self.store.by_key(key) else {
            return;
        };
        if item.is_folder() {
            return;
        }
        self.editing.toggle(key, multi_select);
        self.update_visible();
    }

    /// Seeds the tag editor with the whole selection at once.
    pub fn begin_batch_tagging(&mut self) {
        let keys: Vec<String> = self.selection.keys().map(str::to_string).collect();
        self.editing.seed(keys.iter().map(String::as_str));
        self.update_visible();
    }

    pub fn stop_editing(&mut self) {
        self.editing.clear();
        self.update_visible();
    }

    /// Tags shared by every item currently in the tag editor.
    pub fn common_tags(&self) -> BTreeSet<String> {
        self.editing.common_tags(&self.store)
    }

    /// Activates a non-folder item, emitting [`GalleryEvent::ItemActivated`].
    /// Folder activation goes through [`Gallery::navigate_to`] instead.
    pub fn activate(&mut self, key: &str) -> bool {
        let Some(item) = self.store.by_key(key) else {
            return false;
        };
        if item.is_folder() {
            return false;
        }
        self.events.emit(GalleryEvent::ItemActivated {
            item: item.clone(),
        });
        true
    }

    // ----- metadata mutations --------------------------------------------

    /// Sets the rating of one item. The local copy only changes after the
    /// backend has accepted the update.
    pub async fn set_rating(&mut self, key: &str, rating: u8) -> Result<(), GalleryError> {
        let guard = MutationGuard::acquire(&self.mutation_in_flight)?;
        let Some(path) = self.store.by_key(key).and_then(|i| i.path.clone()) else {
            return Ok(());
        };

        let result = self
            .provider
            .update_metadata(&path, &MetadataPatch::rating(rating))
            .await;
        drop(guard);

        result?;
        self.mutate_item(key, |item| item.rating = rating);
        Ok(())
    }

    /// Adds a tag to every item in the tag editor, each independently.
    pub async fn add_tag(&mut self, tag: &str) -> Result<MutationOutcome, GalleryError> {
        self.mutate_tags(|tags, tag| {
            tags.insert(tag.to_string());
        }, tag)
        .await
    }

    /// Removes a tag from every item in the tag editor that carries it.
    pub async fn remove_tag(&mut self, tag: &str) -> Result<MutationOutcome, GalleryError> {
        self.mutate_tags(|tags, tag| {
            tags.remove(tag);
        }, tag)
        .await
    }

    async fn mutate_tags(
        &mut self,
        apply: impl Fn(&mut BTreeSet<String>, &str),
        tag: &str,
    ) -> Result<MutationOutcome, GalleryError> {
        let guard = MutationGuard::acquire(&self.mutation_in_flight)?;
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(MutationOutcome::default());
        }

        let members: Vec<String> = self.editing.keys().map(str::to_string).collect();
        let mut outcome = MutationOutcome::default();

        for key in members {
            let Some(item) = self.store.by_key(&key) else {
                continue;
            };
            let Some(path) = item.path.clone() else {
                continue;
            };
            let mut tags = item.tags.clone();
            apply(&mut tags, tag);
            if tags == item.tags {
                continue;
            }

            match self
                .provider
                .update_metadata(&path, &MetadataPatch::tags(tags.clone()))
                .await
            {
                Ok(()) => {
                    self.mutate_item(&key, |item| item.tags = tags.clone());
                    outcome.record_ok();
                }
                Err(err) => {
                    debug!("Tag update rejected for {path}: {err}");
                    outcome.record_err();
                }
            }
        }
        drop(guard);

        if !outcome.all_ok() {
            warn!(
                "Tag update {:?} failed for {} of {} items",
                tag,
                outcome.failed,
                outcome.applied + outcome.failed
            );
        }
        self.update_visible();
        Ok(outcome)
    }

    /// Deletes every selected item, then reloads the directory so the store
    /// reflects what actually remains on disk.
    pub async fn delete_selected(&mut self) -> Result<MutationOutcome, GalleryError> {
        let guard = MutationGuard::acquire(&self.mutation_in_flight)?;
        let paths: Vec<String> = self
            .selection
            .keys()
            .filter_map(|key| self.store.by_key(key).and_then(|i| i.path.clone()))
            .collect();
        if paths.is_empty() {
            return Ok(MutationOutcome::default());
        }

        let mut outcome = MutationOutcome::default();
        for path in &paths {
            match self.provider.delete_item(path).await {
                Ok(()) => outcome.record_ok(),
                Err(err) => {
                    debug!("Delete rejected for {path}: {err}");
                    outcome.record_err();
                }
            }
        }
        drop(guard);

        if !outcome.all_ok() {
            warn!("Delete failed for {} of {} items", outcome.failed, paths.len());
        }

        self.selection.clear();
        self.emit_selection_changed();
        self.reload(true).await?;
        Ok(outcome)
    }

    /// Applies a confirmed mutation to the raw listing and the store copy,
    /// then drops the card so it is rebuilt with fresh content.
    fn mutate_item(&mut self, key: &str, apply: impl Fn(&mut MediaItem)) {
        for item in self.raw.iter_mut().filter(|i| i.key() == key) {
            apply(item);
        }
        if let Some(item) = self.store.by_key_mut(key) {
            apply(item);
        }
        self.pool.invalidate(key);
        self.update_visible();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemKind;
    use crate::remote::DirectoryListing;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct MockProvider {
        listings: Mutex<HashMap<String, Vec<MediaItem>>>,
        fail_list: AtomicBool,
        fail_metadata: AtomicBool,
        hang_metadata: AtomicBool,
        fail_delete: AtomicBool,
        metadata_calls: AtomicUsize,
        deleted: Mutex<Vec<String>>,
    }

    impl MockProvider {
        fn with_items(directory: &str, items: Vec<MediaItem>) -> Self {
            let provider = Self::default();
            provider
                .listings
                .lock()
                .insert(directory.to_string(), items);
            provider
        }
    }

    impl DirectoryProvider for &MockProvider {
        async fn list_directory(
            &self,
            path: &str,
            _force_refresh: bool,
        ) -> Result<DirectoryListing, GalleryError> {
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(GalleryError::Load {
                    message: "listing unavailable".into(),
                });
            }
            let items = self
                .listings
                .lock()
                .get(path)
                .cloned()
                .ok_or_else(|| GalleryError::Load {
                    message: format!("no such directory: {path}"),
                })?;
            Ok(DirectoryListing {
                items,
                current_directory: path.to_string(),
                parent_directory: path.rsplit_once('/').map(|(p, _)| p.to_string()),
            })
        }

        async fn update_metadata(
            &self,
            path: &str,
            _patch: &MetadataPatch,
        ) -> Result<(), GalleryError> {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            if self.hang_metadata.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_metadata.load(Ordering::SeqCst) {
                return Err(GalleryError::Mutation {
                    path: path.to_string(),
                    message: "rejected".into(),
                });
            }
            Ok(())
        }

        async fn delete_item(&self, path: &str) -> Result<(), GalleryError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(GalleryError::Delete {
                    path: path.to_string(),
                    message: "rejected".into(),
                });
            }
            self.deleted.lock().push(path.to_string());
            let mut listings = self.listings.lock();
            for items in listings.values_mut() {
                items.retain(|item| item.path.as_deref() != Some(path));
            }
            Ok(())
        }
    }

    fn image(name: &str, mtime: f64) -> MediaItem {
        let mut item = MediaItem::new_media(ItemKind::Image, format!("/input/{name}"), name);
        item.mtime = mtime;
        item
    }

    fn sample_items(n: usize) -> Vec<MediaItem> {
        (0..n).map(|i| image(&format!("{i:02}.png"), i as f64)).collect()
    }

    fn test_settings() -> DisplaySettings {
        DisplaySettings {
            sort_by: SortField::Name,
            sort_order: SortOrder::Asc,
            ..DisplaySettings::default()
        }
    }

    async fn loaded_gallery(provider: &MockProvider) -> Gallery<&MockProvider> {
        let mut gallery = Gallery::with_settings(provider, test_settings(), None);
        gallery.set_container(800.0, 600.0, Instant::now());
        gallery.load_files("/input", false).await.unwrap();
        gallery
    }

    #[tokio::test]
    async fn test_load_builds_store_layout_and_cards() {
        let provider = MockProvider::with_items("/input", sample_items(6));
        let gallery = loaded_gallery(&provider).await;

        assert_eq!(*gallery.load_state(), LoadState::Loaded);
        assert_eq!(gallery.store().len(), 6);
        assert_eq!(gallery.layout().entries.len(), 6);
        assert_eq!(gallery.card_count(), 6);
        assert_eq!(gallery.current_directory(), Some("/input"));
    }

    #[tokio::test]
    async fn test_load_failure_enters_placeholder_state() {
        let provider = MockProvider::with_items("/input", sample_items(3));
        let mut gallery = loaded_gallery(&provider).await;
        let events = gallery.events();
        while events.try_recv().is_ok() {}

        provider.fail_list.store(true, Ordering::SeqCst);
        assert!(gallery.reload(false).await.is_err());

        assert!(matches!(gallery.load_state(), LoadState::Failed(_)));
        assert_eq!(gallery.store().len(), 0);
        assert_eq!(gallery.card_count(), 0);
        assert!(matches!(
            events.try_recv(),
            Ok(GalleryEvent::LoadFailed { .. })
        ));

        // Still navigable: a later successful load recovers.
        provider.fail_list.store(false, Ordering::SeqCst);
        gallery.reload(false).await.unwrap();
        assert_eq!(*gallery.load_state(), LoadState::Loaded);
        assert_eq!(gallery.store().len(), 3);
    }

    #[tokio::test]
    async fn test_scroll_windowing_is_debounced() {
        let provider = MockProvider::with_items("/input", sample_items(200));
        let mut gallery = loaded_gallery(&provider).await;
        let initial = gallery.card_count();
        assert!(initial < 200, "window should not cover 200 items");

        let now = Instant::now();
        gallery.set_scroll_top(5000.0, now);
        assert_eq!(gallery.card_count(), initial, "scroll applies only after the window");

        gallery.poll_deferred(now + Duration::from_millis(50));
        assert!(gallery.card_count() > 0);
        assert!(gallery
            .cards()
            .all(|card| card.entry.top + card.entry.height > 5000.0 - DEFAULT_OVERSCAN
                && card.entry.top < 5000.0 + 600.0 + DEFAULT_OVERSCAN));
    }

    #[tokio::test]
    async fn test_free_text_filter_debounces_and_applies_last() {
        let provider = MockProvider::with_items("/input", sample_items(20));
        let mut gallery = loaded_gallery(&provider).await;

        let now = Instant::now();
        gallery.set_filter(ItemFilter::Filename("0".into()), now);
        gallery.set_filter(ItemFilter::Filename("01".into()), now + Duration::from_millis(100));
        assert_eq!(gallery.store().len(), 20);

        gallery.poll_deferred(now + Duration::from_millis(250));
        assert_eq!(gallery.store().len(), 20, "window restarts on each keystroke");
        gallery.poll_deferred(now + Duration::from_millis(400));
        assert_eq!(gallery.store().len(), 1);
    }

    #[tokio::test]
    async fn test_discrete_filter_applies_immediately() {
        let provider = MockProvider::with_items("/input", sample_items(10));
        let mut gallery = loaded_gallery(&provider).await;

        let mut raw = sample_items(10);
        raw[3].rating = 5;
        provider.listings.lock().insert("/input".into(), raw);
        gallery.reload(false).await.unwrap();

        gallery.set_filter(ItemFilter::MinRating(4), Instant::now());
        assert_eq!(gallery.store().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_prunes_selection() {
        let provider = MockProvider::with_items("/input", sample_items(10));
        let mut gallery = loaded_gallery(&provider).await;
        gallery.toggle_select("/input/03.png");
        gallery.toggle_select("/input/07.png");
        assert_eq!(gallery.selection().len(), 2);

        gallery.set_filter(ItemFilter::Filename("03".into()), Instant::now());
        gallery.poll_deferred(Instant::now() + Duration::from_millis(301));
        assert_eq!(gallery.selection().len(), 1);
        assert!(gallery.selection().contains("/input/03.png"));
    }

    #[tokio::test]
    async fn test_rating_mutation_is_server_first() {
        let provider = MockProvider::with_items("/input", sample_items(3));
        let mut gallery = loaded_gallery(&provider).await;

        provider.fail_metadata.store(true, Ordering::SeqCst);
        assert!(gallery.set_rating("/input/01.png", 4).await.is_err());
        assert_eq!(
            gallery.store().by_key("/input/01.png").unwrap().rating,
            0,
            "rejected update must not change the local copy"
        );

        provider.fail_metadata.store(false, Ordering::SeqCst);
        gallery.set_rating("/input/01.png", 4).await.unwrap();
        assert_eq!(gallery.store().by_key("/input/01.png").unwrap().rating, 4);
    }

    #[tokio::test]
    async fn test_cancelled_mutation_releases_guard() {
        let provider = MockProvider::with_items("/input", sample_items(2));
        let mut gallery = loaded_gallery(&provider).await;

        provider.hang_metadata.store(true, Ordering::SeqCst);
        let timed_out = tokio::time::timeout(
            Duration::from_millis(10),
            gallery.set_rating("/input/00.png", 3),
        )
        .await;
        assert!(timed_out.is_err(), "hung mutation should time out");
        assert!(
            !gallery.mutation_in_flight(),
            "dropping the mutation future must release the guard"
        );

        provider.hang_metadata.store(false, Ordering::SeqCst);
        gallery.set_rating("/input/00.png", 3).await.unwrap();
        assert_eq!(gallery.store().by_key("/input/00.png").unwrap().rating, 3);
    }

    #[tokio::test]
    async fn test_rating_invalidates_card() {
        let provider = MockProvider::with_items("/input", sample_items(3));
        let mut gallery = loaded_gallery(&provider).await;
        let before = gallery.pool.handle_for("/input/01.png").unwrap();
        let stale_rating = gallery.pool.get(before).unwrap().rating;
        assert_eq!(stale_rating, 0);

        gallery.set_rating("/input/01.png", 5).await.unwrap();
        let after = gallery.pool.handle_for("/input/01.png").unwrap();
        assert_eq!(gallery.pool.get(after).unwrap().rating, 5);
    }

    #[tokio::test]
    async fn test_add_tag_applies_per_item_and_reports_failures() {
        let mut items = sample_items(3);
        items[0].tags.insert("old".into());
        let provider = MockProvider::with_items("/input", items);
        let mut gallery = loaded_gallery(&provider).await;

        gallery.toggle_select("/input/00.png");
        gallery.toggle_select("/input/01.png");
        gallery.begin_batch_tagging();

        let outcome = gallery.add_tag("new").await.unwrap();
        assert_eq!(outcome, MutationOutcome { applied: 2, failed: 0 });
        assert!(gallery.store().by_key("/input/00.png").unwrap().tags.contains("old"));
        assert!(gallery.store().by_key("/input/00.png").unwrap().tags.contains("new"));
        assert!(gallery.store().by_key("/input/01.png").unwrap().tags.contains("new"));
        assert!(!gallery.store().by_key("/input/02.png").unwrap().tags.contains("new"));

        provider.fail_metadata.store(true, Ordering::SeqCst);
        let outcome = gallery.remove_tag("new").await.unwrap();
        assert_eq!(outcome, MutationOutcome { applied: 0, failed: 2 });
        assert!(
            gallery.store().by_key("/input/00.png").unwrap().tags.contains("new"),
            "rejected removal leaves tags unchanged"
        );
    }

    #[tokio::test]
    async fn test_add_existing_tag_skips_backend() {
        let mut items = sample_items(1);
        items[0].tags.insert("dup".into());
        let provider = MockProvider::with_items("/input", items);
        let mut gallery = loaded_gallery(&provider).await;

        gallery.toggle_editing("/input/00.png", false);
        let outcome = gallery.add_tag("dup").await.unwrap();
        assert_eq!(outcome, MutationOutcome::default());
        assert_eq!(provider.metadata_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_common_tags_follow_editing_set() {
        let mut items = sample_items(2);
        items[0].tags = ["red", "blue"].iter().map(|t| t.to_string()).collect();
        items[1].tags = ["red"].iter().map(|t| t.to_string()).collect();
        let provider = MockProvider::with_items("/input", items);
        let mut gallery = loaded_gallery(&provider).await;

        gallery.toggle_editing("/input/00.png", false);
        assert_eq!(gallery.common_tags().len(), 2);
        gallery.toggle_editing("/input/01.png", true);
        assert_eq!(
            gallery.common_tags(),
            ["red".to_string()].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn test_delete_selected_reloads_and_prunes() {
        let provider = MockProvider::with_items("/input", sample_items(5));
        let mut gallery = loaded_gallery(&provider).await;

        gallery.toggle_select("/input/01.png");
        gallery.select_range("/input/03.png");
        assert_eq!(gallery.selection().len(), 3);
        gallery.begin_batch_tagging();
        assert_eq!(gallery.editing_count(), 3);

        let outcome = gallery.delete_selected().await.unwrap();
        assert_eq!(outcome, MutationOutcome { applied: 3, failed: 0 });
        assert_eq!(gallery.store().len(), 2);
        assert!(gallery.selection().is_empty());
        assert_eq!(gallery.editing_count(), 0);
        assert!(!gallery.is_editing("/input/02.png"));
        assert_eq!(gallery.card_count(), 2);
        assert_eq!(provider.deleted.lock().len(), 3);
    }

    #[tokio::test]
    async fn test_folders_not_selectable_and_navigate() {
        let mut items = sample_items(2);
        items.push(MediaItem::new_folder("sub"));
        let provider = MockProvider::with_items("/input", items);
        provider
            .listings
            .lock()
            .insert("/input/sub".into(), sample_items(1));
        let mut gallery = loaded_gallery(&provider).await;

        gallery.toggle_select("sub");
        assert!(gallery.selection().is_empty());
        assert!(!gallery.activate("sub"));

        gallery.navigate_to("/input/sub").await.unwrap();
        assert_eq!(gallery.store().len(), 1);
        assert_eq!(gallery.parent_directory(), Some("/input"));

        assert!(gallery.navigate_up().await.unwrap());
        assert_eq!(gallery.current_directory(), Some("/input"));
    }

    #[tokio::test]
    async fn test_activation_emits_event() {
        let provider = MockProvider::with_items("/input", sample_items(2));
        let mut gallery = loaded_gallery(&provider).await;
        let events = gallery.events();
        while events.try_recv().is_ok() {}

        assert!(gallery.activate("/input/01.png"));
        match events.try_recv() {
            Ok(GalleryEvent::ItemActivated { item }) => assert_eq!(item.name, "01.png"),
            other => panic!("expected activation event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ratio_note_defers_masonry_relayout() {
        let provider = MockProvider::with_items("/input", sample_items(4));
        let mut gallery = loaded_gallery(&provider).await;
        gallery.update_settings(|s| s.packing = PackingPolicy::MasonryColumns);

        let square_height = gallery.layout().entries[0].height;
        let now = Instant::now();
        gallery.note_aspect_ratio("/input/00.png", 2.0, now);
        assert_eq!(gallery.layout().entries[0].height, square_height);

        gallery.poll_deferred(now + Duration::from_millis(200));
        let entry = gallery
            .layout()
            .entries[gallery.store().position("/input/00.png").unwrap()];
        assert!(entry.height < square_height, "wide image gets a shorter card");
    }

    #[tokio::test]
    async fn test_ratio_survives_reload() {
        let provider = MockProvider::with_items("/input", sample_items(2));
        let mut gallery = loaded_gallery(&provider).await;
        gallery.note_aspect_ratio("/input/00.png", 1.6, Instant::now());

        gallery.reload(true).await.unwrap();
        assert_eq!(
            gallery.store().by_key("/input/00.png").unwrap().aspect_ratio,
            Some(1.6)
        );
    }

    #[tokio::test]
    async fn test_resize_is_debounced_and_subsumes_ratio() {
        let provider = MockProvider::with_items("/input", sample_items(9));
        let mut gallery = loaded_gallery(&provider).await;
        gallery.update_settings(|s| s.packing = PackingPolicy::MasonryColumns);
        let columns = gallery.layout().column_count;

        let now = Instant::now();
        gallery.note_aspect_ratio("/input/00.png", 2.0, now);
        gallery.set_container(1600.0, 600.0, now);
        assert_eq!(gallery.layout().column_count, columns);

        gallery.poll_deferred(now + Duration::from_millis(250));
        assert!(gallery.layout().column_count > columns);
        assert_eq!(gallery.next_deadline(), None, "relayout drained the ratio slot");
    }

    #[tokio::test]
    async fn test_sort_change_reorders_store() {
        let provider = MockProvider::with_items("/input", sample_items(3));
        let mut gallery = loaded_gallery(&provider).await;
        assert_eq!(gallery.store().get(0).unwrap().name, "00.png");

        gallery.set_sort(SortField::Date, SortOrder::Desc);
        assert_eq!(gallery.store().get(0).unwrap().name, "02.png");
    }

    #[tokio::test]
    async fn test_info_row_toggle_changes_card_height() {
        let provider = MockProvider::with_items("/input", sample_items(3));
        let mut gallery = loaded_gallery(&provider).await;
        let tall = gallery.layout().entries[0].height;

        gallery.update_settings(|s| {
            s.show_tags = false;
            s.show_filename = false;
        });
        assert!(gallery.layout().entries[0].height < tall);
    }
}
