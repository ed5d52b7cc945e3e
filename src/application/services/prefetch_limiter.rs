//! Concurrency-bounded, deduplicating prefetch scheduler.

use std::collections::{HashMap, HashSet};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, trace};

use crate::domain::entities::{PreloadRecord, PreloadState, PrefetchStatus, Priority};

use super::prefetch_executor::PrefetchExecutor;
use super::prefetch_queue::PrefetchQueue;

/// Default number of simultaneous prefetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

type Completion = Shared<BoxFuture<'static, ()>>;

/// Completion signal of one URL's prefetch, shared by every submitter.
struct Ticket {
    tx: oneshot::Sender<()>,
    done: Completion,
}

impl Ticket {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel::<()>();
        let done = rx.map(|_| ()).boxed().shared();
        Self { tx, done }
    }

    fn handle(&self) -> PrefetchHandle {
        PrefetchHandle {
            done: Some(self.done.clone()),
        }
    }

    fn resolve(self) {
        let _ = self.tx.send(());
    }
}

/// Awaitable completion of a submitted prefetch.
///
/// Resolves once the prefetch settles, whatever the outcome. Dropping it does
/// not cancel anything.
#[derive(Clone)]
pub struct PrefetchHandle {
    done: Option<Completion>,
}

impl PrefetchHandle {
    /// A handle that is already resolved.
    #[must_use]
    pub const fn ready() -> Self {
        Self { done: None }
    }

    /// Returns true if the prefetch has already settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.done.as_ref().is_none_or(|done| done.peek().is_some())
    }
}

impl std::fmt::Debug for PrefetchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchHandle")
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl IntoFuture for PrefetchHandle {
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            if let Some(done) = self.done {
                done.await;
            }
        })
    }
}

#[derive(Default)]
struct LimiterState {
    records: HashMap<String, PreloadRecord>,
    active: HashMap<String, Ticket>,
    queue: PrefetchQueue<Ticket>,
}

impl LimiterState {
    fn is_preloaded(&self, url: &str) -> bool {
        self.records.get(url).is_some_and(|r| r.state.is_success())
    }

    fn status(&self) -> PrefetchStatus {
        PrefetchStatus {
            preloaded: self
                .records
                .values()
                .filter(|r| r.state.is_success())
                .count(),
            active: self.active.len(),
            queued: self.queue.len(),
        }
    }

    fn is_idle(&self) -> bool {
        self.active.is_empty() && self.queue.is_empty()
    }
}

struct LimiterInner {
    state: Mutex<LimiterState>,
    executor: PrefetchExecutor,
    max_concurrent: usize,
    idle: Notify,
}

/// Bounds simultaneous prefetches and orders waiting work by priority.
///
/// Owns the preload records, the in-flight map and the waiting queue. All
/// bookkeeping happens under one lock that is never held across an await.
/// At most `max_concurrent` prefetches execute at once and each URL has at
/// most one execution in flight.
#[derive(Clone)]
pub struct PrefetchLimiter {
    inner: Arc<LimiterInner>,
}

impl PrefetchLimiter {
    /// Creates a limiter. A cap of zero is treated as one.
    #[must_use]
    pub fn new(executor: PrefetchExecutor, max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                state: Mutex::new(LimiterState::default()),
                executor,
                max_concurrent: max_concurrent.max(1),
                idle: Notify::new(),
            }),
        }
    }

    /// Returns the concurrency cap.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Requests a prefetch of `url`.
    ///
    /// Already preloaded URLs resolve immediately. A URL that is in flight or
    /// waiting yields the existing handle; a waiting URL is moved to a better
    /// band when `priority` is higher. Otherwise the prefetch starts now if a
    /// slot is free, or waits in the queue.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime and a slot is free.
    pub fn submit(&self, url: &str, priority: Priority) -> PrefetchHandle {
        if url.is_empty() {
            return PrefetchHandle::ready();
        }

        let mut state = self.inner.state.lock();

        if state.is_preloaded(url) {
            trace!(url = %url, "Already preloaded");
            return PrefetchHandle::ready();
        }

        if let Some(ticket) = state.active.get(url) {
            trace!(url = %url, "Prefetch already in flight");
            return ticket.handle();
        }

        if let Some(handle) = state.queue.get(url).map(Ticket::handle) {
            if state.queue.upgrade(url, priority) {
                debug!(url = %url, priority = %priority, "Upgraded queued prefetch");
            }
            return handle;
        }

        state
            .records
            .entry(url.to_string())
            .and_modify(|record| {
                record.retry();
            })
            .or_insert_with(|| PreloadRecord::pending(url));

        let ticket = Ticket::new();
        let handle = ticket.handle();

        if state.active.len() < self.inner.max_concurrent {
            state.active.insert(url.to_string(), ticket);
            drop(state);
            self.spawn(url.to_string(), priority);
        } else {
            state.queue.push(url, priority, ticket);
            debug!(
                url = %url,
                priority = %priority,
                queued = state.queue.len(),
                "Prefetch queued"
            );
        }

        handle
    }

    fn spawn(&self, url: String, priority: Priority) {
        trace!(url = %url, priority = %priority, "Starting prefetch");
        let limiter = self.clone();
        tokio::spawn(async move {
            let outcome = limiter.inner.executor.execute(url.clone()).await;
            limiter.complete(&url, outcome);
        });
    }

    /// Records a settled prefetch, frees its slot and drains the queue.
    fn complete(&self, url: &str, outcome: PreloadState) {
        let mut next = Vec::new();
        let idle = {
            let mut state = self.inner.state.lock();

            state
                .records
                .entry(url.to_string())
                .or_insert_with(|| PreloadRecord::pending(url))
                .settle(outcome);

            if let Some(ticket) = state.active.remove(url) {
                ticket.resolve();
            }

            while state.active.len() < self.inner.max_concurrent
                && let Some((queued_url, priority, ticket)) = state.queue.pop()
            {
                if state.is_preloaded(&queued_url) {
                    ticket.resolve();
                    continue;
                }
                state.active.insert(queued_url.clone(), ticket);
                next.push((queued_url, priority));
            }

            state.is_idle()
        };

        for (queued_url, priority) in next {
            self.spawn(queued_url, priority);
        }

        if idle {
            trace!("Prefetch limiter idle");
            self.inner.idle.notify_waiters();
        }
    }

    /// Returns true if `url` has been successfully prefetched.
    #[must_use]
    pub fn is_preloaded(&self, url: &str) -> bool {
        self.inner.state.lock().is_preloaded(url)
    }

    /// State of the record for `url`, if one exists.
    #[must_use]
    pub fn record(&self, url: &str) -> Option<PreloadState> {
        self.inner.state.lock().records.get(url).map(|r| r.state)
    }

    /// Returns current counters.
    #[must_use]
    pub fn status(&self) -> PrefetchStatus {
        self.inner.state.lock().status()
    }

    /// Evicts settled records whose URL is not in `keep`.
    ///
    /// Records of queued or in-flight URLs are kept; nothing is cancelled.
    /// Returns the number of evicted records.
    pub fn clear<I, S>(&self, keep: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keep: HashSet<String> = keep.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut state = self.inner.state.lock();
        let before = state.records.len();
        state
            .records
            .retain(|url, record| keep.contains(url) || !record.state.is_settled());
        let evicted = before - state.records.len();
        if evicted > 0 {
            debug!(evicted, kept = state.records.len(), "Evicted preload records");
        }
        evicted
    }

    /// Drops every waiting prefetch. In-flight prefetches keep running.
    ///
    /// Handles of dropped prefetches resolve. Returns how many were dropped.
    pub fn cancel_pending(&self) -> usize {
        let (count, idle) = {
            let mut state = self.inner.state.lock();
            let dropped = state.queue.drain();
            let count = dropped.len();
            for (url, ticket) in dropped {
                if state.records.get(&url).is_some_and(|r| !r.state.is_settled()) {
                    state.records.remove(&url);
                }
                trace!(url = %url, "Dropped queued prefetch");
                ticket.resolve();
            }
            (count, state.is_idle())
        };

        if count > 0 {
            debug!(count, "Cancelled queued prefetches");
        }
        if idle {
            self.inner.idle.notify_waiters();
        }
        count
    }

    /// Waits until nothing is in flight or queued.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.state.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for PrefetchLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchLimiter")
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockPrefetcher;
    use std::time::Duration;

    fn limiter(port: &Arc<MockPrefetcher>, cap: usize) -> PrefetchLimiter {
        let executor = PrefetchExecutor::new(port.clone(), Duration::from_secs(5));
        PrefetchLimiter::new(executor, cap)
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..1_000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        assert!(condition(), "condition not reached");
    }

    #[tokio::test]
    async fn test_duplicate_submit_runs_once() {
        let port = Arc::new(MockPrefetcher::gated());
        let limiter = limiter(&port, 3);

        let first = limiter.submit("u1", Priority::High);
        let second = limiter.submit("u1", Priority::Low);
        wait_for(|| port.in_flight() == 1).await;

        assert_eq!(limiter.status().active, 1);
        port.release(1);
        first.await;
        second.await;

        assert_eq!(port.call_count("u1"), 1);
        assert!(limiter.is_preloaded("u1"));
    }

    #[tokio::test]
    async fn test_concurrency_bound() {
        let port = Arc::new(MockPrefetcher::gated());
        let limiter = limiter(&port, 3);

        for i in 0..10 {
            limiter.submit(&format!("u{i}"), Priority::Normal);
        }
        wait_for(|| port.in_flight() == 3).await;

        assert_eq!(limiter.status().active, 3);
        assert_eq!(limiter.status().queued, 7);
        assert_eq!(port.calls().len(), 3);

        for started in 4..=10 {
            port.release(1);
            wait_for(|| port.calls().len() == started).await;
            assert!(port.in_flight() <= 3);
        }
        port.release(3);
        limiter.wait_idle().await;

        assert_eq!(port.calls().len(), 10);
        assert_eq!(port.high_water(), 3);
        assert_eq!(limiter.status().preloaded, 10);
    }

    #[tokio::test]
    async fn test_queue_served_by_priority() {
        let port = Arc::new(MockPrefetcher::gated());
        let limiter = limiter(&port, 1);

        limiter.submit("blocker", Priority::High);
        wait_for(|| port.in_flight() == 1).await;
        limiter.submit("a", Priority::Low);
        limiter.submit("b", Priority::High);
        limiter.submit("c", Priority::Normal);

        for expected in 2..=4 {
            port.release(1);
            wait_for(|| port.calls().len() == expected).await;
        }
        port.release(1);
        limiter.wait_idle().await;

        assert_eq!(port.calls(), vec!["blocker", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_queued_resubmit_upgrades_without_duplicate() {
        let port = Arc::new(MockPrefetcher::gated());
        let limiter = limiter(&port, 1);

        limiter.submit("blocker", Priority::High);
        wait_for(|| port.in_flight() == 1).await;
        limiter.submit("far", Priority::Low);
        limiter.submit("near", Priority::Normal);
        limiter.submit("far", Priority::High);

        assert_eq!(limiter.status().queued, 2);
        port.release(3);
        limiter.wait_idle().await;

        assert_eq!(port.calls(), vec!["blocker", "far", "near"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_queue() {
        let port = Arc::new(MockPrefetcher::instant());
        port.fail_on("bad");
        let limiter = limiter(&port, 1);

        limiter.submit("bad", Priority::High);
        limiter.submit("good-1", Priority::Normal);
        limiter.submit("good-2", Priority::Low);
        limiter.wait_idle().await;

        assert_eq!(port.calls(), vec!["bad", "good-1", "good-2"]);
        assert!(!limiter.is_preloaded("bad"));
        assert_eq!(limiter.record("bad"), Some(PreloadState::Failed));
        assert!(limiter.is_preloaded("good-1"));
        assert!(limiter.is_preloaded("good-2"));
    }

    #[tokio::test]
    async fn test_failed_url_is_retried_on_next_submit() {
        let port = Arc::new(MockPrefetcher::instant());
        port.fail_on("bad");
        let limiter = limiter(&port, 3);

        limiter.submit("bad", Priority::High).await;
        assert_eq!(limiter.record("bad"), Some(PreloadState::Failed));

        limiter.submit("bad", Priority::High).await;
        assert_eq!(port.call_count("bad"), 2);
    }

    #[tokio::test]
    async fn test_preloaded_short_circuit() {
        let port = Arc::new(MockPrefetcher::instant());
        let limiter = limiter(&port, 3);

        limiter.submit("u", Priority::Normal).await;
        assert!(limiter.is_preloaded("u"));

        let handle = limiter.submit("u", Priority::High);
        assert!(handle.is_settled());
        limiter.wait_idle().await;

        assert_eq!(port.call_count("u"), 1);
    }

    #[tokio::test]
    async fn test_empty_url_is_ignored() {
        let port = Arc::new(MockPrefetcher::instant());
        let limiter = limiter(&port, 3);

        assert!(limiter.submit("", Priority::High).is_settled());
        assert!(port.calls().is_empty());
        assert_eq!(limiter.status(), PrefetchStatus::default());
    }

    #[tokio::test]
    async fn test_clear_keeps_listed_and_unsettled() {
        let port = Arc::new(MockPrefetcher::gated());
        let limiter = limiter(&port, 3);

        port.release(2);
        limiter.submit("a", Priority::High).await;
        limiter.submit("b", Priority::High).await;
        limiter.submit("c", Priority::High);
        wait_for(|| port.in_flight() == 1).await;

        assert_eq!(limiter.clear(["a"]), 1);
        assert!(limiter.is_preloaded("a"));
        assert!(!limiter.is_preloaded("b"));
        assert_eq!(limiter.record("c"), Some(PreloadState::Pending));

        port.release(1);
        limiter.wait_idle().await;
        assert!(limiter.is_preloaded("c"));
        assert_eq!(limiter.status().preloaded, 2);
    }

    #[tokio::test]
    async fn test_cancel_pending_leaves_in_flight() {
        let port = Arc::new(MockPrefetcher::gated());
        let limiter = limiter(&port, 1);

        limiter.submit("running", Priority::High);
        wait_for(|| port.in_flight() == 1).await;
        let queued = limiter.submit("queued", Priority::Low);

        assert_eq!(limiter.cancel_pending(), 1);
        queued.await;
        assert_eq!(limiter.record("queued"), None);

        port.release(1);
        limiter.wait_idle().await;

        assert_eq!(port.calls(), vec!["running"]);
        assert!(limiter.is_preloaded("running"));
    }

    #[tokio::test]
    async fn test_wait_idle_returns_immediately_when_idle() {
        let port = Arc::new(MockPrefetcher::instant());
        let limiter = limiter(&port, 3);

        tokio_test::assert_ready!(tokio_test::task::spawn(limiter.wait_idle()).poll());
    }
}
