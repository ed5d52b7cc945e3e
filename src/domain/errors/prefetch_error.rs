//! Prefetch error types.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single URL's prefetch.
///
/// Always recovered locally by the executor; never reaches `refocus` callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PrefetchError {
    #[error("network error while prefetching: {message}")]
    Network { message: String },

    #[error("CDN answered with HTTP {code}")]
    Status { code: u16 },

    #[error("prefetch timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("unexpected prefetch error: {message}")]
    Unexpected { message: String },
}

impl PrefetchError {
    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates HTTP status error.
    #[must_use]
    pub const fn status(code: u16) -> Self {
        Self::Status { code }
    }

    /// Creates timeout error.
    #[must_use]
    pub const fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    /// Creates unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns whether a later attempt could plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Status { code } => *code >= 500 || *code == 429,
            Self::Unexpected { .. } => false,
        }
    }
}
