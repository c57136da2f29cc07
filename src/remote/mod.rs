//! External collaborators: the directory/metadata backend and thumbnail URLs.
//!
//! The gallery core never performs network I/O itself; it drives an async
//! [`DirectoryProvider`] and tolerates its failures. Thumbnail fetches are
//! fire-and-forget on the embedder's side — the core only constructs URLs.

use std::collections::BTreeSet;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::error::GalleryError;
use crate::models::MediaItem;

/// A directory listing as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListing {
    #[serde(default)]
    pub items: Vec<MediaItem>,
    pub current_directory: String,
    #[serde(default)]
    pub parent_directory: Option<String>,
}

/// Partial metadata update; omitted fields are left unchanged server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
}

impl MetadataPatch {
    pub fn rating(rating: u8) -> Self {
        Self {
            rating: Some(rating),
            tags: None,
        }
    }

    pub fn tags(tags: BTreeSet<String>) -> Self {
        Self {
            rating: None,
            tags: Some(tags),
        }
    }
}

/// Async backend the gallery talks to. Calls are non-blocking suspension
/// points; there is no cancellation — a superseded navigation simply has its
/// result overwritten by the next wholesale store replacement.
pub trait DirectoryProvider {
    /// Lists one directory level. `force_refresh` bypasses any backend cache.
    fn list_directory(
        &self,
        path: &str,
        force_refresh: bool,
    ) -> impl std::future::Future<Output = Result<DirectoryListing, GalleryError>>;

    fn update_metadata(
        &self,
        path: &str,
        patch: &MetadataPatch,
    ) -> impl std::future::Future<Output = Result<(), GalleryError>>;

    fn delete_item(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<(), GalleryError>>;
}

/// Characters escaped in the filepath query value, matching what a browser's
/// `encodeURIComponent` would produce for the ones that matter here.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'?');

/// Builds a thumbnail URL for an item. Pure string construction, no round
/// trip; the cache-bust token (typically the mtime) keeps stale browser
/// caches from outliving file edits.
pub fn thumbnail_url(path: &str, cache_bust: i64) -> String {
    format!(
        "/imageloader/thumbnail?filepath={}&t={}",
        utf8_percent_encode(path, QUERY_VALUE),
        cache_bust
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbnail_url_encodes_path() {
        let url = thumbnail_url("/input/sub dir/a&b.png", 1714000000);
        assert_eq!(
            url,
            "/imageloader/thumbnail?filepath=/input/sub%20dir/a%26b.png&t=1714000000"
        );
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = MetadataPatch::rating(4);
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"rating":4}"#);

        let patch = MetadataPatch::tags(["b".to_string(), "a".to_string()].into());
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"tags":["a","b"]}"#);
    }

    #[test]
    fn test_listing_deserializes() {
        let json = r#"{
            "items": [
                {"name": "sub", "type": "folder"},
                {"name": "a.png", "type": "image", "path": "/input/a.png", "mtime": 5.0}
            ],
            "current_directory": "/input",
            "parent_directory": null
        }"#;
        let listing: DirectoryListing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.items.len(), 2);
        assert_eq!(listing.current_directory, "/input");
        assert!(listing.parent_directory.is_none());
    }
}
