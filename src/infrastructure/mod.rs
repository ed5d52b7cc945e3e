//! Infrastructure layer with external service adapters.

/// Application configuration.
pub mod config;
/// Scrapbook content adapters.
pub mod content;
/// Image downloading and in-memory caching.
pub mod image;

pub use config::{AppConfig, CliArgs, LogLevel, StateConfig, StorageManager};
pub use content::JsonContentStore;
pub use image::{CacheStats, HttpImagePrefetcher, HttpPrefetcherConfig, MemoryImageCache};
