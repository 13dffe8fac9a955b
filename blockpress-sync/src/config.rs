//! Timing knobs for the save pipeline and session.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Save and refresh timing, loadable from a YAML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Quiet period after the last edit before a save is issued
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long a fetched document is served from cache
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Remote refreshes are ignored for this long after a local edit
    #[serde(default = "default_edit_grace_ms")]
    pub edit_grace_ms: u64,

    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_edit_grace_ms() -> u64 {
    2000
}

fn default_notice_capacity() -> usize {
    64
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            edit_grace_ms: default_edit_grace_ms(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

impl SyncConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "debounce_ms",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn edit_grace(&self) -> Duration {
        Duration::from_millis(self.edit_grace_ms)
    }
}
