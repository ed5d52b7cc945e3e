//! Domain entity definitions.

mod memory;
mod preload;

pub use memory::{Memory, MemoryId, PrefetchSource, ScrapbookId};
pub use preload::{PreloadRecord, PreloadState, PrefetchStatus, Priority};
