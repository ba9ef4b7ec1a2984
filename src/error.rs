//! Error types for the day/night client
//!
//! ## Table of Contents
//! - **ClockError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, ClockError>`
//!
//! None of these are fatal to the clock itself: sync failures degrade to
//! device-local time and phase notifications are best-effort.

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClockError>;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClockError {
    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport failure talking to the backend (connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("backend returned HTTP {status} for {path}")]
    Http {
        /// Response status code
        status: u16,
        /// Request path
        path: String,
    },

    /// Response body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Local state store failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClockError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the failure happened before any response arrived
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for ClockError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<toml::de::Error> for ClockError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
