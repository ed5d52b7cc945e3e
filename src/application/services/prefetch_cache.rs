//! Windowed prefetch cache: turns "the user now looks at item `i`" into a
//! prioritized batch of prefetches.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{PrefetchSource, PrefetchStatus, Priority};
use crate::domain::ports::ImagePrefetchPort;
use crate::domain::services::url_optimizer::{DEFAULT_MEMO_CAPACITY, DEFAULT_WIDTH};
use crate::domain::services::{CdnRules, FocusWindow, ResolutionTiers, UrlOptimizer};

use super::prefetch_executor::{DEFAULT_TIMEOUT, PrefetchExecutor};
use super::prefetch_limiter::{DEFAULT_MAX_CONCURRENT, PrefetchHandle, PrefetchLimiter};

/// Tunables of a [`WindowedPrefetchCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchSettings {
    /// Maximum simultaneous prefetches.
    pub max_concurrent: usize,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Default window around the focused item.
    pub window: FocusWindow,
    /// Widths and priorities by distance.
    pub tiers: ResolutionTiers,
    /// Width used for plain URL batches.
    pub default_width: u32,
    /// CDN rewrite rules.
    pub rules: CdnRules,
    /// Capacity of the URL optimization memo.
    pub memo_capacity: usize,
}

impl Default for PrefetchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout: DEFAULT_TIMEOUT,
            window: FocusWindow::default(),
            tiers: ResolutionTiers::default(),
            default_width: DEFAULT_WIDTH,
            rules: CdnRules::default(),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        }
    }
}

/// One prefetch derived from a window slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPrefetch {
    /// Index of the item in the list.
    pub index: usize,
    /// Distance from the focused item.
    pub distance: usize,
    /// Optimized delivery URL.
    pub url: String,
    /// Requested pixel width.
    pub width: u32,
    /// Queue band.
    pub priority: Priority,
}

/// Result of a refocus request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refocus {
    /// Prefetches were submitted for the window.
    Scheduled {
        /// Number of URLs submitted.
        submitted: usize,
    },
    /// The same window for the same center is still settling; nothing was done.
    Duplicate,
}

#[derive(Debug)]
struct PendingRefocus {
    center: usize,
    urls: Vec<String>,
    generation: u64,
}

#[derive(Debug, Default)]
struct RefocusGuard {
    pending: Option<PendingRefocus>,
    generation: u64,
}

/// Prefetches a bounded window of images around the focused item.
///
/// Constructed explicitly and shared by reference; there is no global
/// instance. All prefetch failures stay inside the cache.
pub struct WindowedPrefetchCache {
    optimizer: UrlOptimizer,
    limiter: PrefetchLimiter,
    window: FocusWindow,
    tiers: ResolutionTiers,
    default_width: u32,
    guard: Arc<Mutex<RefocusGuard>>,
}

impl WindowedPrefetchCache {
    /// Creates a cache prefetching through `port`.
    #[must_use]
    pub fn new(port: Arc<dyn ImagePrefetchPort>, settings: PrefetchSettings) -> Self {
        let executor = PrefetchExecutor::new(port, settings.timeout);
        let limiter = PrefetchLimiter::new(executor, settings.max_concurrent);
        let optimizer = UrlOptimizer::new(settings.rules, settings.memo_capacity);
        Self {
            optimizer,
            limiter,
            window: settings.window,
            tiers: settings.tiers,
            default_width: settings.default_width,
            guard: Arc::new(Mutex::new(RefocusGuard::default())),
        }
    }

    /// Returns the default window.
    #[must_use]
    pub const fn window(&self) -> FocusWindow {
        self.window
    }

    /// Returns the underlying limiter.
    #[must_use]
    pub const fn limiter(&self) -> &PrefetchLimiter {
        &self.limiter
    }

    /// Delivery URL of `raw_url` at `width` pixels.
    pub fn optimized_url(&self, raw_url: &str, width: u32) -> String {
        self.optimizer.optimize(raw_url, width)
    }

    /// Computes the prefetches for `window` around `center` without submitting.
    pub fn plan<T: PrefetchSource>(
        &self,
        items: &[T],
        center: usize,
        window: FocusWindow,
    ) -> Vec<PlannedPrefetch> {
        window
            .slots(center, items.len())
            .into_iter()
            .filter_map(|slot| {
                let raw_url = items.get(slot.index)?.image_url()?;
                let tier = self.tiers.for_distance(slot.distance);
                Some(PlannedPrefetch {
                    index: slot.index,
                    distance: slot.distance,
                    url: self.optimizer.optimize(raw_url, tier.width),
                    width: tier.width,
                    priority: tier.priority,
                })
            })
            .filter(|planned| !planned.url.is_empty())
            .collect()
    }

    /// Prefetches the window `[center - back, center + forward]` of `items`.
    ///
    /// Returns immediately. A call that plans exactly the batch of a previous
    /// call for the same center which has not settled yet is dropped.
    pub fn refocus<T: PrefetchSource>(
        &self,
        items: &[T],
        center: usize,
        back: usize,
        forward: usize,
    ) -> Refocus {
        let plan = self.plan(items, center, FocusWindow::new(back, forward));
        let urls: Vec<String> = plan.iter().map(|p| p.url.clone()).collect();

        let generation = {
            let mut guard = self.guard.lock();
            if let Some(pending) = &guard.pending
                && pending.center == center
                && pending.urls == urls
            {
                debug!(center, "Dropping duplicate refocus");
                return Refocus::Duplicate;
            }
            guard.generation = guard.generation.wrapping_add(1);
            let generation = guard.generation;
            guard.pending = Some(PendingRefocus {
                center,
                urls,
                generation,
            });
            generation
        };

        let handles: Vec<PrefetchHandle> = plan
            .iter()
            .map(|p| {
                trace!(
                    index = p.index,
                    distance = p.distance,
                    width = p.width,
                    priority = %p.priority,
                    url = %p.url,
                    "Submitting window prefetch"
                );
                self.limiter.submit(&p.url, p.priority)
            })
            .collect();

        debug!(
            center,
            back,
            forward,
            submitted = plan.len(),
            "Refocused prefetch window"
        );

        if handles.iter().all(PrefetchHandle::is_settled) {
            Self::release_guard(&self.guard, generation);
        } else {
            let guard = Arc::clone(&self.guard);
            tokio::spawn(async move {
                join_all(handles.into_iter().map(IntoFuture::into_future)).await;
                Self::release_guard(&guard, generation);
            });
        }

        Refocus::Scheduled {
            submitted: plan.len(),
        }
    }

    /// [`refocus`](Self::refocus) with the configured window.
    pub fn refocus_default<T: PrefetchSource>(&self, items: &[T], center: usize) -> Refocus {
        self.refocus(items, center, self.window.back, self.window.forward)
    }

    fn release_guard(guard: &Mutex<RefocusGuard>, generation: u64) {
        let mut guard = guard.lock();
        if guard
            .pending
            .as_ref()
            .is_some_and(|p| p.generation == generation)
        {
            guard.pending = None;
        }
    }

    /// Returns true while the latest refocus batch is still settling.
    #[must_use]
    pub fn has_pending_refocus(&self) -> bool {
        self.guard.lock().pending.is_some()
    }

    /// Prefetches one already optimized URL.
    pub fn preload(&self, url: &str, priority: Priority) -> PrefetchHandle {
        self.limiter.submit(url, priority)
    }

    /// Prefetches raw URLs at the default width with normal priority.
    pub fn preload_urls<I, S>(&self, raw_urls: I) -> Vec<PrefetchHandle>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        raw_urls
            .into_iter()
            .filter(|raw| !raw.as_ref().is_empty())
            .map(|raw| {
                let url = self.optimizer.optimize(raw.as_ref(), self.default_width);
                self.limiter.submit(&url, Priority::Normal)
            })
            .collect()
    }

    /// Returns true if `url` has been successfully prefetched.
    #[must_use]
    pub fn is_preloaded(&self, url: &str) -> bool {
        self.limiter.is_preloaded(url)
    }

    /// Evicts settled records not listed in `keep_urls`.
    pub fn clear<I, S>(&self, keep_urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.limiter.clear(keep_urls)
    }

    /// Evicts settled records outside the default window around `center`.
    pub fn retain_window<T: PrefetchSource>(&self, items: &[T], center: usize) -> usize {
        let keep = self.plan(items, center, self.window);
        self.clear(keep.iter().map(|p| p.url.as_str()))
    }

    /// Drops waiting prefetches; in-flight ones finish normally.
    pub fn cancel_pending(&self) -> usize {
        self.limiter.cancel_pending()
    }

    /// Returns current counters.
    #[must_use]
    pub fn status(&self) -> PrefetchStatus {
        self.limiter.status()
    }

    /// Waits until nothing is in flight or queued.
    pub async fn wait_idle(&self) {
        self.limiter.wait_idle().await;
    }
}

impl std::fmt::Debug for WindowedPrefetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedPrefetchCache")
            .field("window", &self.window)
            .field("tiers", &self.tiers)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
