//! Client configuration
//!
//! Loaded from TOML and validated up front so misconfiguration fails at
//! startup, not on the first request. `credential_path` is optional: when
//! absent (or when persistent storage is unavailable) the client runs with
//! an in-memory credential slot.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Settings for [`crate::ApiClient::from_config`].
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the platform API, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Per-request deadline.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Deadline for the refresh call; exceeding it is a refresh failure.
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
    /// Backing file for the credential slot. `None` selects in-memory.
    #[serde(default)]
    pub credential_path: Option<PathBuf>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    10
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values. Called by `load` and by `from_config` for
    /// configs built in code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.refresh_timeout_secs == 0 {
            return Err(ConfigError::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
