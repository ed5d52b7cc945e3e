//! Use case implementations.

mod browse_scrapbook_use_case;

pub use browse_scrapbook_use_case::{BrowseScrapbookUseCase, Navigation};
