//! Configuration file loading

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config option `{0}` must not be empty")]
    Missing(&'static str),
}

/// Process-wide settings, read once at startup
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Queue log written by the telephony switch
    pub queue_log: PathBuf,

    /// Mattermost incoming webhook
    pub mattermost_api_url: String,

    /// Directory searched for call recordings
    pub recording_path: PathBuf,

    /// Public URL prefix for recordings
    pub recording_url: String,

    pub redis_host: String,

    #[serde(default)]
    pub redis_password: String,

    /// Key prefix for customer entries
    #[serde(default)]
    pub redis_path: String,

    /// Queue code to display name
    #[serde(default)]
    pub queues: HashMap<String, String>,

    /// Phone numbers allowed to trigger alerts (empty = all)
    #[serde(default)]
    pub phone_numbers_whitelist: Vec<String>,

    #[serde(default)]
    pub show_add_contact_url: bool,

    #[serde(default)]
    pub add_contact_url: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Config {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Reject settings the notifier cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_log.as_os_str().is_empty() {
            return Err(ConfigError::Missing("queue_log"));
        }
        if self.mattermost_api_url.is_empty() {
            return Err(ConfigError::Missing("mattermost_api_url"));
        }
        if self.recording_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("recording_path"));
        }
        if self.redis_host.is_empty() {
            return Err(ConfigError::Missing("redis_host"));
        }
        if self.show_add_contact_url && self.add_contact_url.is_empty() {
            return Err(ConfigError::Missing("add_contact_url"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Base URL for "add contact" links, if enabled
    pub fn add_contact_base(&self) -> Option<&str> {
        self.show_add_contact_url
            .then_some(self.add_contact_url.as_str())
    }
}
