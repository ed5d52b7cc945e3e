//! Runs one prefetch against the image prefetch port.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::entities::PreloadState;
use crate::domain::errors::PrefetchError;
use crate::domain::ports::ImagePrefetchPort;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Wraps the prefetch port so every attempt settles to a [`PreloadState`].
///
/// Errors, timeouts and panics inside the port are logged and reported as
/// [`PreloadState::Failed`]; nothing is retried here.
#[derive(Clone)]
pub struct PrefetchExecutor {
    port: Arc<dyn ImagePrefetchPort>,
    timeout: Duration,
}

impl PrefetchExecutor {
    /// Creates an executor over `port` with a per-attempt timeout.
    #[must_use]
    pub fn new(port: Arc<dyn ImagePrefetchPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Prefetches `url`, never failing outward.
    pub async fn execute(&self, url: String) -> PreloadState {
        match self.attempt(&url).await {
            Ok(()) => {
                debug!(url = %url, "Preloaded image");
                PreloadState::Success
            }
            Err(e) => {
                warn!(url = %url, error = %e, transient = e.is_transient(), "Prefetch failed");
                PreloadState::Failed
            }
        }
    }

    /// One bounded attempt, with timeouts and panics folded into the error.
    async fn attempt(&self, url: &str) -> Result<(), PrefetchError> {
        let port = Arc::clone(&self.port);
        let timeout = self.timeout;
        let task_url = url.to_string();

        tokio::spawn(async move {
            tokio::time::timeout(timeout, port.prefetch(&task_url))
                .await
                .unwrap_or(Err(PrefetchError::timeout(timeout)))
        })
        .await
        .unwrap_or_else(|e| Err(PrefetchError::unexpected(format!("prefetch task aborted: {e}"))))
    }
}

impl std::fmt::Debug for PrefetchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchExecutor")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
