//! Persisted display settings.
//!
//! Read once at construction, written on every change. Stored as JSON under
//! the platform config directory. Unknown or missing fields fall back to
//! their defaults so older settings files keep loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::layout::{InfoRows, PackingPolicy};
use crate::models::{SortField, SortOrder};

/// How a thumbnail fills its card. Purely advisory for the renderer; the
/// layout does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    Cover,
    Contain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub show_rating: bool,
    pub show_tags: bool,
    pub show_filename: bool,
    /// Minimum card width in pixels; drives the column count.
    pub thumbnail_size: u32,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub image_fit: ImageFit,
    pub packing: PackingPolicy,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_rating: true,
            show_tags: true,
            show_filename: true,
            thumbnail_size: 150,
            sort_by: SortField::Date,
            sort_order: SortOrder::Desc,
            image_fit: ImageFit::Cover,
            packing: PackingPolicy::UniformGrid,
        }
    }
}

impl DisplaySettings {
    /// Default settings file location under the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "mediagrid")
            .context("Failed to determine project directories")?;
        Ok(proj_dirs.config_dir().join("settings.json"))
    }

    /// Loads settings, falling back to defaults when the file is missing or
    /// unreadable. A corrupt settings file must never block the gallery.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!("Ignoring unparseable settings at {:?}: {}", path, err);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        Ok(())
    }

    /// Info rows enabled for card layout, derived from the display toggles.
    pub fn info_rows(&self) -> InfoRows {
        InfoRows {
            rating: self.show_rating,
            filename: self.show_filename,
            tags: self.show_tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = DisplaySettings::default();
        settings.thumbnail_size = 300;
        settings.sort_by = SortField::Rating;
        settings.packing = PackingPolicy::MasonryColumns;
        settings.save(&path).unwrap();

        let loaded = DisplaySettings::load(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let loaded = DisplaySettings::load(&dir.path().join("absent.json"));
        assert_eq!(loaded, DisplaySettings::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(DisplaySettings::load(&path), DisplaySettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"thumbnail_size": 200}"#).unwrap();

        let loaded = DisplaySettings::load(&path);
        assert_eq!(loaded.thumbnail_size, 200);
        assert!(loaded.show_rating);
        assert_eq!(loaded.sort_by, SortField::Date);
    }

    #[test]
    fn test_info_rows_follow_toggles() {
        let mut settings = DisplaySettings::default();
        settings.show_tags = false;
        let rows = settings.info_rows();
        assert!(rows.rating && rows.filename && !rows.tags);
    }
}
