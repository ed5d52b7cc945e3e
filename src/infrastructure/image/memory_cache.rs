//! In-memory LRU cache of downloaded image bytes.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Default maximum number of images kept in memory.
pub const DEFAULT_CACHE_SIZE: usize = 64;

/// LRU of encoded image bodies keyed by delivery URL.
pub struct MemoryImageCache {
    cache: RwLock<LruCache<String, Bytes>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the specified capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(cap)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default capacity.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }

    /// Returns the body for `url`, promoting it in the LRU.
    pub async fn get(&self, url: &str) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        if let Some(body) = cache.get(url) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory cache hit");
            Some(body.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(url = %url, "Memory cache miss");
            None
        }
    }

    /// Returns true if `url` is cached, without promoting it.
    pub async fn contains(&self, url: &str) -> bool {
        self.cache.read().await.contains(url)
    }

    /// Stores the body for `url`.
    pub async fn put(&self, url: impl Into<String>, body: Bytes) {
        let url = url.into();
        debug!(url = %url, bytes = body.len(), "Storing image in memory cache");
        self.cache.write().await.put(url, body);
    }

    /// Drops `url` from the cache.
    pub async fn evict(&self, url: &str) -> bool {
        let removed = self.cache.write().await.pop(url).is_some();
        if removed {
            debug!(url = %url, "Evicted image from memory cache");
        }
        removed
    }

    /// Drops everything.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
        debug!("Cleared memory image cache");
    }

    /// Number of cached images.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Returns cache statistics.
    #[allow(clippy::cast_precision_loss)]
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let cache = self.cache.read().await;
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: cache.len(),
            bytes: cache.iter().map(|(_, body)| body.len()).sum(),
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Total size of cached bodies.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} KiB), {:.1}% hit rate ({} hits, {} misses)",
            self.size,
            self.bytes / 1024,
            self.hit_rate,
            self.hits,
            self.misses
        )
    }
}
