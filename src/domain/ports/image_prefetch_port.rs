//! Port definition for the image prefetch primitive.

use async_trait::async_trait;

use crate::domain::errors::PrefetchError;

/// Asks the image-loading subsystem to fetch and cache one URL ahead of display.
/// Implementations must be thread-safe.
#[async_trait]
pub trait ImagePrefetchPort: Send + Sync {
    /// Prefetches `url`. Resolves once the image is warm or the attempt failed.
    async fn prefetch(&self, url: &str) -> Result<(), PrefetchError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use tokio::sync::Semaphore;

    /// Controllable prefetcher for testing.
    ///
    /// Gated instances hold every call until [`MockPrefetcher::release`]
    /// hands out permits, so tests decide when slots free up.
    pub struct MockPrefetcher {
        calls: Mutex<Vec<String>>,
        failing: Mutex<HashSet<String>>,
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockPrefetcher {
        /// Creates a prefetcher that resolves immediately.
        pub fn instant() -> Self {
            Self::build(None)
        }

        /// Creates a prefetcher that blocks until released.
        pub fn gated() -> Self {
            Self::build(Some(Arc::new(Semaphore::new(0))))
        }

        fn build(gate: Option<Arc<Semaphore>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                failing: Mutex::new(HashSet::new()),
                in_flight: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
                gate,
            }
        }

        /// Makes every prefetch of `url` fail.
        pub fn fail_on(&self, url: &str) {
            self.failing.lock().insert(url.to_string());
        }

        /// Lets `n` blocked calls complete.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        /// URLs passed to `prefetch`, in call order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        /// Number of calls made for `url`.
        pub fn call_count(&self, url: &str) -> usize {
            self.calls.lock().iter().filter(|u| *u == url).count()
        }

        /// Calls currently blocked inside `prefetch`.
        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Highest number of simultaneous calls observed.
        pub fn high_water(&self) -> usize {
            self.high_water.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImagePrefetchPort for MockPrefetcher {
        async fn prefetch(&self, url: &str) -> Result<(), PrefetchError> {
            self.calls.lock().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate
                && let Ok(permit) = gate.acquire().await
            {
                permit.forget();
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().contains(url) {
                Err(PrefetchError::network("mock failure"))
            } else {
                Ok(())
            }
        }
    }
}
