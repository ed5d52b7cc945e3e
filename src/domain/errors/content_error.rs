//! Content store error types.

use thiserror::Error;

/// Errors raised by content store adapters.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ContentError {
    #[error("memory not found: {id}")]
    MemoryNotFound { id: String },

    #[error("scrapbook not found: {id}")]
    ScrapbookNotFound { id: String },

    #[error("failed to read content library: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed content library: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ContentError {
    /// Creates memory-not-found error.
    #[must_use]
    pub fn memory_not_found(id: impl Into<String>) -> Self {
        Self::MemoryNotFound { id: id.into() }
    }

    /// Creates scrapbook-not-found error.
    #[must_use]
    pub fn scrapbook_not_found(id: impl Into<String>) -> Self {
        Self::ScrapbookNotFound { id: id.into() }
    }

    /// Returns whether the error means the requested item does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MemoryNotFound { .. } | Self::ScrapbookNotFound { .. }
        )
    }
}
