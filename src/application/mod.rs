//! Application layer with prefetch services and use cases.

/// Prefetch scheduling services.
pub mod services;
/// Use case implementations.
pub mod use_cases;

pub use services::{PrefetchSettings, Refocus, WindowedPrefetchCache};
pub use use_cases::{BrowseScrapbookUseCase, Navigation};
