use thiserror::Error;

/// Failures surfaced by the gallery. None of them are fatal: a load failure
/// replaces the grid with a placeholder state and the gallery stays
/// navigable; mutation failures are contained to the items they touched.
#[derive(Debug, Error)]
pub enum GalleryError {
    /// Directory listing rejected or returned an error payload.
    #[error("directory listing failed: {message}")]
    Load { message: String },

    /// Metadata update rejected for one item.
    #[error("metadata update failed for {path}: {message}")]
    Mutation { path: String, message: String },

    /// Delete rejected for one item.
    #[error("delete failed for {path}: {message}")]
    Delete { path: String, message: String },

    /// Another metadata mutation is still in flight; the caller should
    /// retry after it settles (affordances are expected to be disabled).
    #[error("a metadata mutation is already in flight")]
    MutationInFlight,
}

/// Per-batch summary for tag and delete operations. Failures are reported
/// once per batch, not once per item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationOutcome {
    pub applied: usize,
    pub failed: usize,
}

impl MutationOutcome {
    pub fn record_ok(&mut self) {
        self.applied += 1;
    }

    pub fn record_err(&mut self) {
        self.failed += 1;
    }

    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}
