//! Visibility windowing over a computed layout.
//!
//! Only the cards inside the scroll window plus a lookahead margin are
//! rendered. The margin pre-renders just-off-screen cards so scrolling does
//! not expose blank gaps while thumbnails load.

use crate::layout::LayoutEntry;

/// Default lookahead margin in pixels above and below the viewport.
pub const DEFAULT_OVERSCAN: f32 = 1500.0;

/// Indices of entries whose vertical extent intersects
/// `[scroll_top - padding, scroll_top + viewport_height + padding]`.
///
/// Returned in ascending order.
pub fn visible_indices(
    entries: &[LayoutEntry],
    scroll_top: f32,
    viewport_height: f32,
    padding: f32,
) -> Vec<usize> {
    let window_start = scroll_top - padding;
    let window_end = scroll_top + viewport_height + padding;

    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| {
            entry.top + entry.height > window_start && entry.top < window_end
        })
        .map(|(index, _)| index)
        .collect()
}
