mod item;
mod ratios;
mod store;

pub use item::{ItemKind, MediaItem};
pub use ratios::RatioCache;
pub use store::{ItemFilter, ItemStore, SortField, SortOrder};
