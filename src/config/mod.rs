//! Configuration management for urlsetter.
//!
//! Configuration is read from `~/.config/urlsetter/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::http_client::DEFAULT_USER_AGENT;
use crate::resolver::{ResolverSettings, DEFAULT_MAX_REDIRECTS, DEFAULT_WORKERS};
use crate::router::DEFAULT_MOBILE_REDIRECT_HOSTS;
use crate::store::DEFAULT_CAPACITY_BYTES;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub cache: CacheConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Redirects followed before a resolution fails (default: 10)
    pub max_redirects: usize,
    /// Per-request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Seconds before the "taking longer" notice (default: 5)
    pub slow_notice_secs: u64,
    /// Resolutions hitting the network at once (default: 10)
    pub max_concurrency: usize,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_redirects: DEFAULT_MAX_REDIRECTS,
            request_timeout_secs: 10,
            slow_notice_secs: 5,
            max_concurrency: DEFAULT_WORKERS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settings(&self) -> ResolverSettings {
        ResolverSettings {
            max_redirects: self.max_redirects,
            slow_notice_after: Duration::from_secs(self.slow_notice_secs),
            max_concurrency: self.max_concurrency,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Database file; `None` uses the platform data directory
    pub path: Option<PathBuf>,
    pub capacity_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None,
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub mobile_redirect_hosts: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            mobile_redirect_hosts: DEFAULT_MOBILE_REDIRECT_HOSTS
                .iter()
                .map(|h| h.to_string())
                .collect(),
        }
    }
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

    /// Load configuration from an explicit path, which must exist.
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

    /// Get the default config file path: `~/.config/urlsetter/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("urlsetter").join("config.toml"))
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
        r##"# urlsetter configuration

[resolver]
# Redirects followed before giving up on a URL
max_redirects = 10

# Timeout for each HEAD request, in seconds
request_timeout_secs = 10

# Show a "taking longer" notice after this many seconds
slow_notice_secs = 5

# Resolutions allowed to run at once
max_concurrency = 10

user_agent = "urlsetter/0.1.0"

[cache]
# Cache database location (default: <data dir>/urlsetter/cache.db)
# path = "/var/tmp/urlsetter.db"

# Upper bound for cached data, in bytes
capacity_bytes = 1048576

[routing]
# Hosts whose links are tagged as Facebook redirects
mobile_redirect_hosts = ["m.facebook.com"]
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

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
