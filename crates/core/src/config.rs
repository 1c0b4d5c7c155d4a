use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiffConfig {
    pub transport: TransportConfig,
    pub downloads: DownloadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Native libraries tried before the built-in search locations
    pub library_paths: Vec<PathBuf>,
    pub search_default_paths: bool,
    pub endpoint: String,
    /// Health-check the endpoint once before selecting it
    pub probe_endpoint: bool,
    pub request_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            library_paths: Vec::new(),
            search_default_paths: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            probe_endpoint: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

impl DownloadConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RiffConfig {
    /// Defaults, then `config.toml` from the config directory, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_dir() {
            Some(dir) => Self::from_path(&dir.join(CONFIG_FILE))?,
            None => {
                log::warn!("no config directory available, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `KCRIFF_HOME`, or `<platform config dir>/kcriff`.
    pub fn config_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("KCRIFF_HOME") {
            return Some(PathBuf::from(home));
        }
        dirs::config_dir().map(|dir| dir.join("kcriff"))
    }

    /// Reads a config file. A missing file yields the defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `KCRIFF_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("KCRIFF_ENDPOINT") {
            self.transport.endpoint = endpoint;
        }
        if let Some(library) = lookup("KCRIFF_LIBRARY") {
            self.transport.library_paths.insert(0, PathBuf::from(library));
        }
        if let Some(value) = lookup("KCRIFF_POLL_INTERVAL_MS") {
            self.downloads.poll_interval_ms = parse_u64("KCRIFF_POLL_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("KCRIFF_DOWNLOAD_TIMEOUT_SECS") {
            self.downloads.timeout_secs = parse_u64("KCRIFF_DOWNLOAD_TIMEOUT_SECS", &value)?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.downloads.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "downloads.poll_interval_ms".into(),
                value: "0".into(),
            });
        }
        if self.transport.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "transport.endpoint".into(),
                value: self.transport.endpoint.clone(),
            });
        }
        Ok(())
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}
