//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::services::PrefetchSettings;
use crate::domain::services::url_optimizer::{DEFAULT_MEMO_CAPACITY, DEFAULT_WIDTH, UPLOAD_MARKER};
use crate::domain::services::{CdnRules, FocusWindow, ResolutionTiers};

use super::args::CliArgs;
use super::storage::ConfigError;

pub(crate) const APP_NAME: &str = "memento-prefetch";
pub(crate) const APP_QUALIFIER: &str = "app";
pub(crate) const APP_ORGANIZATION: &str = "memento";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Prefetch scheduling.
    #[serde(default)]
    pub prefetch: PrefetchConfig,

    /// CDN URL rewriting.
    #[serde(default)]
    pub cdn: CdnConfig,

    /// HTTP prefetch adapter.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Prefetch scheduling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchConfig {
    /// Maximum simultaneous downloads.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Per-download timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Items prefetched behind the focused one.
    #[serde(default = "default_window_back")]
    pub window_back: usize,

    /// Items prefetched ahead of the focused one.
    #[serde(default = "default_window_forward")]
    pub window_forward: usize,

    /// Width of the focused image.
    #[serde(default = "default_center_width")]
    pub center_width: u32,

    /// Width of direct neighbours.
    #[serde(default = "default_near_width")]
    pub near_width: u32,

    /// Width of everything further away.
    #[serde(default = "default_far_width")]
    pub far_width: u32,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout_secs(),
            window_back: default_window_back(),
            window_forward: default_window_forward(),
            center_width: default_center_width(),
            near_width: default_near_width(),
            far_width: default_far_width(),
        }
    }
}

/// CDN rewrite configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdnConfig {
    /// Path segment after which transformations are inserted.
    #[serde(default = "default_upload_marker")]
    pub upload_marker: String,

    /// Host fragments that take sizing as query parameters.
    #[serde(default = "default_query_hosts")]
    pub query_hosts: Vec<String>,

    /// Quality for query-string hosts.
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Output format for query-string hosts.
    #[serde(default = "default_format")]
    pub format: String,

    /// Optimized URLs remembered.
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: usize,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            upload_marker: default_upload_marker(),
            query_hosts: default_query_hosts(),
            quality: default_quality(),
            format: default_format(),
            memo_capacity: default_memo_capacity(),
        }
    }
}

/// HTTP adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Downloaded images kept in memory.
    #[serde(default = "default_image_cache_size")]
    pub image_cache_size: usize,

    /// User agent sent with image requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            image_cache_size: default_image_cache_size(),
            user_agent: default_user_agent(),
        }
    }
}

const fn default_max_concurrent() -> usize {
    3
}

const fn default_timeout_secs() -> u64 {
    15
}

const fn default_window_back() -> usize {
    2
}

const fn default_window_forward() -> usize {
    3
}

const fn default_center_width() -> u32 {
    1200
}

const fn default_near_width() -> u32 {
    800
}

const fn default_far_width() -> u32 {
    600
}

fn default_upload_marker() -> String {
    UPLOAD_MARKER.to_string()
}

fn default_query_hosts() -> Vec<String> {
    vec!["unsplash".to_string()]
}

const fn default_quality() -> u8 {
    80
}

fn default_format() -> String {
    "webp".to_string()
}

const fn default_memo_capacity() -> usize {
    DEFAULT_MEMO_CAPACITY
}

const fn default_image_cache_size() -> usize {
    64
}

fn default_user_agent() -> String {
    format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(max_concurrent) = args.max_concurrent {
            self.prefetch.max_concurrent = max_concurrent;
        }
    }

    /// Checks the `[prefetch]` and `[cdn]` tables, raising zero limits to 1.
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` for values that cannot be repaired.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.cdn.upload_marker.is_empty() {
            return Err(ConfigError::invalid("cdn.upload_marker", "must not be empty"));
        }
        if self.prefetch.max_concurrent == 0 {
            warn!(field = "prefetch.max_concurrent", "Zero download slots configured, using 1");
            self.prefetch.max_concurrent = 1;
        }
        if self.prefetch.timeout_secs == 0 {
            warn!(field = "prefetch.timeout_secs", "Zero prefetch timeout configured, using 1s");
            self.prefetch.timeout_secs = 1;
        }
        Ok(())
    }

    /// Builds the prefetch cache settings.
    #[must_use]
    pub fn prefetch_settings(&self) -> PrefetchSettings {
        let prefetch = &self.prefetch;
        PrefetchSettings {
            max_concurrent: prefetch.max_concurrent,
            timeout: Duration::from_secs(prefetch.timeout_secs),
            window: FocusWindow::new(prefetch.window_back, prefetch.window_forward),
            tiers: ResolutionTiers::with_widths(
                prefetch.center_width,
                prefetch.near_width,
                prefetch.far_width,
            ),
            default_width: DEFAULT_WIDTH,
            rules: CdnRules {
                upload_marker: self.cdn.upload_marker.clone(),
                query_hosts: self.cdn.query_hosts.clone(),
                quality: self.cdn.quality,
                format: self.cdn.format.clone(),
            },
            memo_capacity: self.cdn.memo_capacity,
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("memento-prefetch.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            prefetch: PrefetchConfig::default(),
            cdn: CdnConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Priority;
    use clap::Parser;

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            log_level = "debug"

            [prefetch]
            max_concurrent = 5
            window_forward = 4

            [cdn]
            query_hosts = ["unsplash", "images.example.org"]
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.prefetch.max_concurrent, 5);
        assert_eq!(config.prefetch.window_forward, 4);
        assert_eq!(config.prefetch.window_back, 2);
        assert_eq!(config.prefetch.center_width, 1200);
        assert_eq!(config.cdn.query_hosts.len(), 2);
        assert_eq!(config.cdn.upload_marker, "/upload/");
        assert_eq!(config.http.image_cache_size, 64);
    }

    #[test]
    fn test_default_settings_match_cache_defaults() {
        let settings = AppConfig::default().prefetch_settings();

        assert_eq!(settings, PrefetchSettings::default());
    }

    #[test]
    fn test_settings_carry_configured_values() {
        let mut config = AppConfig::default();
        config.prefetch.max_concurrent = 5;
        config.prefetch.timeout_secs = 4;
        config.prefetch.center_width = 1600;
        config.cdn.quality = 60;

        let settings = config.prefetch_settings();

        assert_eq!(settings.max_concurrent, 5);
        assert_eq!(settings.timeout, Duration::from_secs(4));
        assert_eq!(settings.tiers.for_distance(0).width, 1600);
        assert_eq!(settings.tiers.for_distance(0).priority, Priority::High);
        assert_eq!(settings.rules.quality, 60);
    }

    #[test]
    fn test_validate_raises_zero_limits() {
        let mut config = AppConfig::default();
        config.prefetch.max_concurrent = 0;
        config.prefetch.timeout_secs = 0;

        config.validate().unwrap();

        let settings = config.prefetch_settings();
        assert_eq!(settings.max_concurrent, 1);
        assert_eq!(settings.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_empty_upload_marker() {
        let mut config = AppConfig::default();
        config.cdn.upload_marker = String::new();

        let result = config.validate();

        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "cdn.upload_marker", .. })
        ));
    }

    #[test]
    fn test_validate_keeps_sane_values() {
        let mut config = AppConfig::default();
        config.prefetch.max_concurrent = 6;

        config.validate().unwrap();

        assert_eq!(config.prefetch.max_concurrent, 6);
        assert_eq!(config.prefetch.timeout_secs, 15);
    }

    #[test]
    fn test_merge_with_args_overrides() {
        let args = CliArgs::parse_from([
            "memento-prefetch",
            "--library",
            "library.json",
            "--max-concurrent",
            "6",
            "--log-level",
            "warn",
        ]);
        let mut config = AppConfig::default();

        config.merge_with_args(&args);

        assert_eq!(config.prefetch.max_concurrent, 6);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_config_serializes_back() {
        let config = AppConfig::default();

        let content = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed.prefetch, config.prefetch);
        assert_eq!(parsed.cdn, config.cdn);
    }
}
