//! Domain error types.

mod content_error;
mod prefetch_error;

pub use content_error::ContentError;
pub use prefetch_error::PrefetchError;
