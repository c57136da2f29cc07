use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Folder,
    Image,
    Video,
    Audio,
}

impl ItemKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "bmp" | "tiff" | "tif" => Some(Self::Image),
            "webm" | "mp4" | "mkv" | "avi" | "mov" => Some(Self::Video),
            "mp3" | "flac" | "ogg" | "wav" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// One entry of a directory listing as reported by the backend.
///
/// Identity is the `path` string; folder entries may arrive without a path,
/// in which case the name stands in as the key. Rating and tags are mutated
/// in place after a successful metadata update (the server stays the source
/// of truth). `aspect_ratio` is unknown until a thumbnail reports its
/// natural dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    #[serde(default)]
    pub path: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Path relative to the collection root, used when activating an item.
    #[serde(default)]
    pub relative_path: Option<String>,
    #[serde(default)]
    pub mtime: f64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub aspect_ratio: Option<f32>,
    #[serde(default)]
    pub has_workflow: bool,
}

impl MediaItem {
    pub fn new_folder(name: impl Into<String>) -> Self {
        Self {
            path: None,
            name: name.into(),
            kind: ItemKind::Folder,
            relative_path: None,
            mtime: 0.0,
            size: 0,
            rating: 0,
            tags: BTreeSet::new(),
            aspect_ratio: None,
            has_workflow: false,
        }
    }

    pub fn new_media(kind: ItemKind, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            name: name.into(),
            kind,
            relative_path: None,
            mtime: 0.0,
            size: 0,
            rating: 0,
            tags: BTreeSet::new(),
            aspect_ratio: None,
            has_workflow: false,
        }
    }

    /// Stable identity: the path, falling back to the name for entries
    /// (typically folders) that carry none.
    pub fn key(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }

    pub fn is_folder(&self) -> bool {
        self.kind == ItemKind::Folder
    }

    /// Folders and audio files have no meaningful visual aspect ratio and
    /// get fixed-height cards in the masonry policy.
    pub fn has_fixed_card_height(&self) -> bool {
        matches!(self.kind, ItemKind::Folder | ItemKind::Audio)
    }

    /// Aspect ratio for layout purposes; defaults to square until a
    /// thumbnail load reports the real dimensions.
    pub fn aspect_ratio_or_default(&self) -> f32 {
        self.aspect_ratio.unwrap_or(1.0).max(0.01)
    }
}
