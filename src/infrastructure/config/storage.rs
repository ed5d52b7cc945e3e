use super::app_config::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER, AppConfig};
use super::state_config::StateConfig;
use directories::ProjectDirs;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.toml";
const STATE_FILE_NAME: &str = "state.toml";

/// Configuration storage errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No home directory to derive the config directory from.
    #[error("failed to determine config directory")]
    ConfigDirNotFound,
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Config could not be serialized.
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    /// Config could not be parsed.
    #[error("toml deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
    /// A setting holds a value the prefetcher cannot run with.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted TOML path of the setting.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-setting error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Owns the directory holding `config.toml` (prefetch, CDN and HTTP tables)
/// and `state.toml` (last scrapbook and focus).
#[derive(Debug)]
pub struct StorageManager {
    config_dir: PathBuf,
}

impl StorageManager {
    /// Resolves the per-user config directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigDirNotFound` without a home directory.
    pub fn new() -> Result<Self, ConfigError> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| Self::with_dir(dirs.config_dir().to_path_buf()))
            .ok_or(ConfigError::ConfigDirNotFound)
    }

    /// Uses `path` as the config directory.
    #[must_use]
    pub fn with_dir(path: PathBuf) -> Self {
        Self { config_dir: path }
    }

    /// Config directory in use.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Creates the config directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the directory cannot be created.
    pub fn ensure_config_dir(&self) -> Result<(), ConfigError> {
        if !self.config_dir.exists() {
            info!(path = %self.config_dir.display(), "Creating configuration directory");
            fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Loads and validates the prefetcher configuration.
    ///
    /// A missing file is created with defaults; a file that does not parse is
    /// left untouched and defaults are used for this run.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on filesystem failure or an unusable setting.
    pub fn load_config(&self, path_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        self.ensure_config_dir()?;
        let path = path_override
            .map_or_else(|| self.config_dir.join(CONFIG_FILE_NAME), Path::to_path_buf);

        let mut config = match read_toml::<AppConfig>(&path)? {
            Some(config) => config,
            None if path.exists() => AppConfig::default(),
            None => {
                info!(path = %path.display(), "Config file not found, writing defaults");
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let config = AppConfig::default();
                write_toml(&path, &config)?;
                config
            }
        };

        config.validate()?;
        debug!(
            path = %path.display(),
            max_concurrent = config.prefetch.max_concurrent,
            timeout_secs = config.prefetch.timeout_secs,
            upload_marker = %config.cdn.upload_marker,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Writes `config` to the default config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_config(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_config_dir()?;
        write_toml(&self.config_dir.join(CONFIG_FILE_NAME), config)
    }

    /// Loads the browsing state, resetting it when missing or unreadable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists but cannot be read.
    pub fn load_state(&self) -> Result<StateConfig, ConfigError> {
        self.ensure_config_dir()?;
        Ok(read_toml(&self.config_dir.join(STATE_FILE_NAME))?.unwrap_or_default())
    }

    /// Saves the browsing state.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save_state(&self, state: &StateConfig) -> Result<(), ConfigError> {
        self.ensure_config_dir()?;
        write_toml(&self.config_dir.join(STATE_FILE_NAME), state)
    }
}

/// Reads `path` as TOML. `None` when the file is missing or malformed.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    match toml::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed TOML file, using defaults");
            Ok(None)
        }
    }
}

/// Replaces `path` atomically through a sibling temp file.
fn write_toml<T: Serialize>(path: &Path, data: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(data)?;
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::other("config path has no parent directory"))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
