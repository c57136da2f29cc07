mod cache;
mod engine;
mod viewport;

pub use cache::LayoutCache;
pub use engine::{GridLayout, InfoRows, LayoutEntry, PackingPolicy, SizingConfig};
pub use viewport::{visible_indices, DEFAULT_OVERSCAN};
