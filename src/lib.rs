//! Virtual-scrolling card grid for media directory browsing.
//!
//! The crate is a headless gallery core: it turns a directory listing into a
//! filtered, sorted item store, computes card geometry for the full store,
//! windows that geometry against a scroll position, and maintains a pool of
//! card descriptors for whatever is currently visible. Rendering, input and
//! network transport belong to the embedder, which drives a [`Gallery`] and
//! implements [`DirectoryProvider`] against its backend.

pub mod debounce;
pub mod error;
pub mod gallery;
pub mod layout;
pub mod models;
pub mod remote;
pub mod settings;

pub use error::{GalleryError, MutationOutcome};
pub use gallery::{Gallery, GalleryEvent, LoadState};
pub use models::{ItemFilter, ItemKind, MediaItem, SortField, SortOrder};
pub use remote::{DirectoryListing, DirectoryProvider, MetadataPatch};
pub use settings::DisplaySettings;
