use serde::{Deserialize, Serialize};

use crate::models::MediaItem;

/// How cards are packed into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingPolicy {
    /// Row-major placement with one fixed card height; rows stay aligned.
    UniformGrid,
    /// Column-balanced placement where media height follows aspect ratio.
    MasonryColumns,
}

/// Which info rows are rendered under the media area. The panel height is a
/// function of the enabled rows so that every card in a uniform grid shares
/// one height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRows {
    pub rating: bool,
    pub filename: bool,
    pub tags: bool,
}

impl InfoRows {
    const BASE_PADDING: f32 = 8.0;
    const RATING_ROW: f32 = 18.0;
    const FILENAME_ROW: f32 = 15.0;
    const TAGS_ROW: f32 = 23.0;
    const MIN_HEIGHT: f32 = 20.0;

    pub fn panel_height(&self) -> f32 {
        let mut height = Self::BASE_PADDING;
        if self.rating {
            height += Self::RATING_ROW;
        }
        if self.filename {
            height += Self::FILENAME_ROW;
        }
        if self.tags {
            height += Self::TAGS_ROW;
        }
        height.max(Self::MIN_HEIGHT)
    }
}

impl Default for InfoRows {
    fn default() -> Self {
        Self {
            rating: true,
            filename: true,
            tags: true,
        }
    }
}

/// Configuration for the card grid layout.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    /// Minimum card width in pixels; drives the column count (default: 150)
    pub min_card_width: f32,
    /// Gap between cards in pixels (default: 5)
    pub gap: f32,
    /// Horizontal padding on each container edge (default: 6)
    pub edge_padding: f32,
    /// Padding above the first row (default: 6)
    pub top_padding: f32,
    /// Floor for the media area height in masonry columns (default: 60)
    pub min_image_height: f32,
    /// Card height for folder/audio items in masonry columns (default: 120)
    pub fixed_card_height: f32,
    pub policy: PackingPolicy,
    pub info: InfoRows,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            min_card_width: 150.0,
            gap: 5.0,
            edge_padding: 6.0,
            top_padding: 6.0,
            min_image_height: 60.0,
            fixed_card_height: 120.0,
            policy: PackingPolicy::UniformGrid,
            info: InfoRows::default(),
        }
    }
}

/// Computed position and size for one item, in item order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutEntry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub column: usize,
    /// Only meaningful for the uniform grid; masonry has no aligned rows.
    pub row: Option<usize>,
}

/// A full layout pass: one entry per item plus the container extent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridLayout {
    pub entries: Vec<LayoutEntry>,
    pub container_height: f32,
    pub column_count: usize,
    pub card_width: f32,
}

impl GridLayout {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl SizingConfig {
    fn column_count(&self, available_width: f32) -> usize {
        ((available_width / (self.min_card_width + self.gap)).floor() as usize).max(1)
    }

    fn card_width(&self, available_width: f32, columns: usize) -> f32 {
        let gaps = (columns - 1) as f32 * self.gap;
        ((available_width - gaps) / columns as f32).max(1.0)
    }

    /// Computes a layout for `items` in order.
    ///
    /// Pure function of its inputs: entries are rebuilt in full on every
    /// call, never patched. Zero items or a zero-width container produce an
    /// empty layout with height 0.
    pub fn compute(&self, items: &[MediaItem], container_width: f32) -> GridLayout {
        if items.is_empty() || container_width <= 0.0 {
            return GridLayout::empty();
        }

        let available = (container_width - 2.0 * self.edge_padding).max(0.0);
        let columns = self.column_count(available);
        let card_width = self.card_width(available, columns);

        match self.policy {
            PackingPolicy::UniformGrid => self.compute_uniform(items, columns, card_width),
            PackingPolicy::MasonryColumns => self.compute_masonry(items, columns, card_width),
        }
    }

    fn compute_uniform(&self, items: &[MediaItem], columns: usize, card_width: f32) -> GridLayout {
        // Square media area plus the info panel keeps every row aligned.
        let card_height = card_width + self.info.panel_height();

        let entries = (0..items.len())
            .map(|index| {
                let row = index / columns;
                let column = index % columns;
                LayoutEntry {
                    left: self.edge_padding + column as f32 * (card_width + self.gap),
                    top: self.top_padding + row as f32 * (card_height + self.gap),
                    width: card_width,
                    height: card_height,
                    column,
                    row: Some(row),
                }
            })
            .collect();

        let total_rows = items.len().div_ceil(columns);
        GridLayout {
            entries,
            container_height: self.top_padding + total_rows as f32 * (card_height + self.gap),
            column_count: columns,
            card_width,
        }
    }

    fn compute_masonry(&self, items: &[MediaItem], columns: usize, card_width: f32) -> GridLayout {
        let info_height = self.info.panel_height();
        let mut column_heights = vec![self.top_padding; columns];

        let entries = items
            .iter()
            .map(|item| {
                let height = if item.has_fixed_card_height() {
                    self.fixed_card_height
                } else {
                    let media = (card_width / item.aspect_ratio_or_default())
                        .max(self.min_image_height);
                    media + info_height
                };

                // First column with the minimum accumulated height.
                let column = column_heights
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map(|(i, _)| i)
                    .unwrap_or(0);

                let entry = LayoutEntry {
                    left: self.edge_padding + column as f32 * (card_width + self.gap),
                    top: column_heights[column],
                    width: card_width,
                    height,
                    column,
                    row: None,
                };
                column_heights[column] += height + self.gap;
                entry
            })
            .collect();

        let container_height = column_heights
            .iter()
            .copied()
            .fold(0.0f32, f32::max);

        GridLayout {
            entries,
            container_height,
            column_count: columns,
            card_width,
        }
    }
}
