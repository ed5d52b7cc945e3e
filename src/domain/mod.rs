//! Domain layer with core entities, pure services and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Pure domain services.
pub mod services;

pub use entities::{Memory, PreloadState, PrefetchStatus, Priority};
pub use errors::{ContentError, PrefetchError};
pub use ports::{ContentStorePort, ImagePrefetchPort};
