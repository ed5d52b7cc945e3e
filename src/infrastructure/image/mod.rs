//! Image download infrastructure.
//!
//! This module provides:
//! - Memory caching of downloaded bodies with LRU eviction
//! - The HTTP adapter behind the image prefetch port

pub mod http_prefetcher;
pub mod memory_cache;

pub use http_prefetcher::{HttpImagePrefetcher, HttpPrefetcherConfig};
pub use memory_cache::{CacheStats, MemoryImageCache};
