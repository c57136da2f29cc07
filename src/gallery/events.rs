//! Outbound gallery events.
//!
//! The gallery pushes coarse change notifications over a channel instead of
//! invoking callbacks; the embedder drains them on its own schedule. Sending
//! never blocks and a dropped receiver is not an error.

use flume::{Receiver, Sender};
use tracing::debug;

use crate::models::MediaItem;

#[derive(Debug, Clone)]
pub enum GalleryEvent {
    /// The store was replaced; `count` is the new item count.
    ItemsChanged { count: usize },
    /// The selection changed; `count` is the new selection size.
    SelectionChanged { count: usize },
    /// A non-folder item was activated (double-click equivalent).
    ItemActivated { item: MediaItem },
    /// A directory load failed; the grid shows the placeholder state.
    LoadFailed { message: String },
}

pub(crate) struct EventSink {
    tx: Sender<GalleryEvent>,
    rx: Receiver<GalleryEvent>,
}

impl EventSink {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self { tx, rx }
    }

    pub fn subscribe(&self) -> Receiver<GalleryEvent> {
        self.rx.clone()
    }

    pub fn emit(&self, event: GalleryEvent) {
        if self.tx.send(event).is_err() {
            debug!("gallery event dropped, no receiver");
        }
    }
}
