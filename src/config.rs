//! Client configuration
//!
//! Loaded from environment variables or a TOML file. Every field has a
//! default so a partial file is valid.

use crate::error::{ClockError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable for the backend base URL
pub const API_BASE_URL_ENV: &str = "JOSEON_API_BASE_URL";

/// Environment variable for the request timeout in milliseconds
pub const REQUEST_TIMEOUT_ENV: &str = "JOSEON_REQUEST_TIMEOUT_MS";

/// Environment variable for the tick interval in milliseconds
pub const TICK_INTERVAL_ENV: &str = "JOSEON_TICK_INTERVAL_MS";

/// Environment variable for the local state file
pub const STORE_PATH_ENV: &str = "JOSEON_STORE_PATH";

/// Configuration for the API client and the day/night provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `https://api.example.com`
    pub api_base_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Clock recompute interval in milliseconds
    pub tick_interval_ms: u64,
    /// JSON file backing the local state store; in-memory when unset
    pub store_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_ms: 10_000,
            tick_interval_ms: 1_000,
            store_path: None,
        }
    }
}

impl ClientConfig {
    /// Config pointing at `api_base_url` with default timings
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(API_BASE_URL_ENV) {
            config.api_base_url = url;
        }
        if let Some(ms) = env_u64(REQUEST_TIMEOUT_ENV)? {
            config.request_timeout_ms = ms;
        }
        if let Some(ms) = env_u64(TICK_INTERVAL_ENV)? {
            config.tick_interval_ms = ms;
        }
        if let Ok(path) = std::env::var(STORE_PATH_ENV) {
            config.store_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClockError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(ClockError::config("api_base_url must not be empty"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClockError::config(format!(
                "api_base_url must be http or https: {}",
                url
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(ClockError::config("request_timeout_ms must be positive"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ClockError::config("tick_interval_ms must be positive"));
        }
        Ok(())
    }

    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Tick interval as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ClockError::config(format!("{} is not a number: {}", name, e))),
        Err(_) => Ok(None),
    }
}
