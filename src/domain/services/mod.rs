//! Pure domain services.

pub mod focus_window;
pub mod url_optimizer;

pub use focus_window::{FocusWindow, ResolutionTiers, Tier, WindowSlot};
pub use url_optimizer::{CdnRules, UrlOptimizer, optimize_url};
