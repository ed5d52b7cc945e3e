//! Prefetch scheduling services.

pub mod prefetch_cache;
pub mod prefetch_executor;
pub mod prefetch_limiter;
pub mod prefetch_queue;

pub use prefetch_cache::{PlannedPrefetch, PrefetchSettings, Refocus, WindowedPrefetchCache};
pub use prefetch_executor::PrefetchExecutor;
pub use prefetch_limiter::{PrefetchHandle, PrefetchLimiter};
pub use prefetch_queue::PrefetchQueue;
