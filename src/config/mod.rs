//! Configuration management for adlog.
//!
//! Configuration is read from `~/.config/adlog/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const DEFAULT_ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub storage: StorageConfig,
}

/// Identity and limits for outbound requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User agent sent with page and image requests
    pub user_agent: String,

    /// Accept-Language sent with page and image requests
    pub accept_language: String,

    /// Page fetch timeout in seconds (default: 20)
    pub page_timeout_secs: u64,

    /// Image download timeout in seconds (default: 30)
    pub image_timeout_secs: u64,

    /// Largest image body accepted, in bytes (default: 20 MiB)
    pub max_image_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            page_timeout_secs: 20,
            image_timeout_secs: 30,
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

impl HttpConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

/// Where listings and their images live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file (default: `<data dir>/adlog/adlog.db`)
    pub database_path: Option<PathBuf>,

    /// Directory images are written under (default: `<data dir>/adlog/media`)
    pub media_root: Option<PathBuf>,

    /// Public prefix the media root is served from
    pub media_url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            media_root: None,
            media_url_prefix: "/media/".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("adlog.db")),
        }
    }

    pub fn media_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.media_root {
            Some(p) => Ok(p.clone()),
            None => Ok(data_dir()?.join("media")),
        }
    }
}

fn data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(data_dir.join("adlog"))
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/adlog/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("adlog").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        format!(
            r##"# adlog configuration

[http]
# Identity sent with every page and image request
user_agent = "{DEFAULT_USER_AGENT}"
accept_language = "{DEFAULT_ACCEPT_LANGUAGE}"

# Timeouts in seconds
page_timeout_secs = 20
image_timeout_secs = 30

# Images larger than this are discarded (bytes)
max_image_bytes = 20971520

[storage]
# Defaults to the platform data directory when unset
# database_path = "/var/lib/adlog/adlog.db"
# media_root = "/var/lib/adlog/media"

# Public prefix the media root is served under
media_url_prefix = "/media/"
"##
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
