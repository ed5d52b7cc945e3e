//! Downloads images over HTTP into the in-memory image cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::domain::errors::PrefetchError;
use crate::domain::ports::ImagePrefetchPort;

use super::memory_cache::MemoryImageCache;

/// Settings for [`HttpImagePrefetcher`].
#[derive(Debug, Clone)]
pub struct HttpPrefetcherConfig {
    /// Images kept in memory.
    pub cache_size: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent header.
    pub user_agent: String,
    /// Honour `HTTP_PROXY`-style environment variables.
    pub system_proxy: bool,
}

impl Default for HttpPrefetcherConfig {
    fn default() -> Self {
        Self {
            cache_size: super::memory_cache::DEFAULT_CACHE_SIZE,
            timeout: Duration::from_secs(15),
            user_agent: format!("memento-prefetch/{}", env!("CARGO_PKG_VERSION")),
            system_proxy: true,
        }
    }
}

/// [`ImagePrefetchPort`] backed by `reqwest` and a [`MemoryImageCache`].
pub struct HttpImagePrefetcher {
    http_client: reqwest::Client,
    cache: Arc<MemoryImageCache>,
    timeout: Duration,
}

impl HttpImagePrefetcher {
    /// Creates a prefetcher with its own cache.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &HttpPrefetcherConfig) -> Result<Self, PrefetchError> {
        Self::with_cache(config, Arc::new(MemoryImageCache::new(config.cache_size)))
    }

    /// Creates a prefetcher filling a shared cache.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_cache(
        config: &HttpPrefetcherConfig,
        cache: Arc<MemoryImageCache>,
    ) -> Result<Self, PrefetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone());
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let http_client = builder
            .build()
            .map_err(|e| PrefetchError::unexpected(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            cache,
            timeout: config.timeout,
        })
    }

    /// The cache this prefetcher fills.
    #[must_use]
    pub fn cache(&self) -> &Arc<MemoryImageCache> {
        &self.cache
    }

    fn map_request_error(&self, e: &reqwest::Error) -> PrefetchError {
        if e.is_timeout() {
            PrefetchError::timeout(self.timeout)
        } else {
            PrefetchError::network(e.to_string())
        }
    }
}

#[async_trait]
impl ImagePrefetchPort for HttpImagePrefetcher {
    async fn prefetch(&self, url: &str) -> Result<(), PrefetchError> {
        if self.cache.contains(url).await {
            trace!(url = %url, "Image already in memory");
            return Ok(());
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrefetchError::status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(&e))?;

        debug!(url = %url, bytes = body.len(), "Downloaded image");
        self.cache.put(url, body).await;
        Ok(())
    }
}

impl std::fmt::Debug for HttpImagePrefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpImagePrefetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
