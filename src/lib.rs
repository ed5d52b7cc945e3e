//! Memento prefetch - windowed image prefetching for swipeable scrapbooks.
//!
//! This crate keeps the images around the focused memory warm: it rewrites
//! delivery URLs for the CDN, ranks a small window of neighbours by distance
//! and downloads them through a bounded, prioritized queue.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing prefetch services and use cases.
pub mod application;
/// Domain layer containing entities, errors, ports and pure services.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "memento-prefetch";
