//! Domain types for image prefetching.

/// Priority band of a prefetch request.
///
/// Ordering follows service order: `High` < `Normal` < `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    /// Served first.
    High = 0,
    /// Default band.
    #[default]
    Normal = 1,
    /// Served last.
    Low = 2,
}

impl Priority {
    /// Numeric rank, lower is served earlier.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Normal => write!(f, "normal"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Completion state of a prefetch for one optimized URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreloadState {
    /// Requested, queued or in flight.
    #[default]
    Pending,
    /// The primitive resolved. Terminal.
    Success,
    /// The primitive rejected or timed out.
    Failed,
}

impl PreloadState {
    /// Returns true once the prefetch has settled either way.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Returns true if the image is known to be warm.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Tracks the state of one URL's prefetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadRecord {
    /// Optimized delivery URL.
    pub url: String,
    /// Current state.
    pub state: PreloadState,
}

impl PreloadRecord {
    /// Creates a pending record.
    #[must_use]
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: PreloadState::Pending,
        }
    }

    /// Applies a settlement. `Success` is terminal and never overwritten.
    ///
    /// Returns true if the state changed.
    pub fn settle(&mut self, outcome: PreloadState) -> bool {
        if self.state.is_success() || self.state == outcome {
            return false;
        }
        self.state = outcome;
        true
    }

    /// Starts a new attempt after a failure. No-op unless `Failed`.
    pub fn retry(&mut self) -> bool {
        if self.state == PreloadState::Failed {
            self.state = PreloadState::Pending;
            true
        } else {
            false
        }
    }
}

/// Point-in-time counters of the prefetch cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrefetchStatus {
    /// URLs known to be successfully prefetched.
    pub preloaded: usize,
    /// Prefetches currently executing.
    pub active: usize,
    /// Prefetches waiting for a slot.
    pub queued: usize,
}

impl PrefetchStatus {
    /// Returns true when nothing is executing or waiting.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.active == 0 && self.queued == 0
    }
}

impl std::fmt::Display for PrefetchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Prefetch: {} preloaded, {} active, {} queued",
            self.preloaded, self.active, self.queued
        )
    }
}
