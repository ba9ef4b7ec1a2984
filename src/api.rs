//! Backend API client
//!
//! ## Table of Contents
//! - **ServerTimeSample**: Payload of `GET /time`
//! - **TimeApi**: The calls the clock needs from the backend
//! - **ApiClient**: reqwest-based implementation with bearer auth

use crate::config::ClientConfig;
use crate::error::{ClockError, Result};
use crate::joseon::Phase;
use crate::token::TokenStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Paths that never carry the bearer token
pub const AUTH_EXCLUDED_PATHS: [&str; 3] = ["/auth/login", "/auth/signup", "/auth/refresh"];

/// Latest instant a sample may carry (±100,000,000 days from the epoch)
pub const MAX_EPOCH_MS: f64 = 8.64e15;

/// Authoritative server time at the moment of the fetch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTimeSample {
    /// Unix time in seconds
    pub epoch_seconds: f64,
    /// Multiplier applied to local elapsed time; 1 when the server omits it
    #[serde(default)]
    pub time_scale: Option<f64>,
}

impl ServerTimeSample {
    /// Sample with an explicit scale
    pub fn new(epoch_seconds: f64, time_scale: f64) -> Self {
        Self {
            epoch_seconds,
            time_scale: Some(time_scale),
        }
    }

    /// Server time in milliseconds
    pub fn epoch_ms(&self) -> i64 {
        (self.epoch_seconds * 1000.0).round() as i64
    }

    /// Scale to use, defaulting to real time
    pub fn scale(&self) -> f64 {
        self.time_scale.unwrap_or(1.0)
    }

    /// Reject a sample the clock cannot anchor on: a non-finite or
    /// out-of-range epoch, or a scale that is not a finite non-negative number.
    pub fn validate(&self) -> Result<()> {
        let epoch_ms = self.epoch_seconds * 1000.0;
        if !epoch_ms.is_finite() || epoch_ms.abs() > MAX_EPOCH_MS {
            return Err(ClockError::decode(format!(
                "epochSeconds out of range: {}",
                self.epoch_seconds
            )));
        }
        let scale = self.scale();
        if !scale.is_finite() || scale < 0.0 {
            return Err(ClockError::decode(format!("timeScale out of range: {}", scale)));
        }
        Ok(())
    }
}

/// Backend calls used by the day/night clock
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeApi: Send + Sync {
    /// `GET /time`
    async fn fetch_server_time(&self) -> Result<ServerTimeSample>;

    /// `POST /day` or `POST /night`; the response body is ignored
    async fn notify_phase(&self, phase: Phase) -> Result<()>;
}

/// Whether a request path skips bearer auth
pub fn is_auth_excluded(path: &str) -> bool {
    AUTH_EXCLUDED_PATHS
        .iter()
        .any(|excluded| path.starts_with(excluded))
}

/// HTTP client for the game backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Option<TokenStore>,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClockError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
            tokens: None,
        })
    }

    /// Attach bearer tokens from a token store
    pub fn with_tokens(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorize(&self, req: RequestBuilder, path: &str) -> RequestBuilder {
        if is_auth_excluded(path) {
            return req;
        }
        match &self.tokens {
            Some(tokens) => match tokens.access_token().await {
                Some(token) => req.bearer_auth(token),
                None => req,
            },
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, path: &str) -> Result<Response> {
        let resp = self.authorize(req, path).await.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClockError::Http {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(resp)
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.send(self.client.get(self.url(path)), path).await?;
        resp.json()
            .await
            .map_err(|e| ClockError::decode(format!("{}: {}", path, e)))
    }

    /// POST without a body, discarding the response body
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(self.client.post(self.url(path)), path).await?;
        Ok(())
    }

    /// `GET /time`
    pub async fn fetch_server_time(&self) -> Result<ServerTimeSample> {
        let sample: ServerTimeSample = self.get_json("/time").await?;
        debug!(
            epoch_seconds = sample.epoch_seconds,
            time_scale = sample.scale(),
            "Fetched server time"
        );
        Ok(sample)
    }

    /// `POST /day`
    pub async fn set_day_phase(&self) -> Result<()> {
        self.post_empty(Phase::Day.endpoint()).await
    }

    /// `POST /night`
    pub async fn set_night_phase(&self) -> Result<()> {
        self.post_empty(Phase::Night.endpoint()).await
    }
}

#[async_trait]
impl TimeApi for ApiClient {
    async fn fetch_server_time(&self) -> Result<ServerTimeSample> {
        ApiClient::fetch_server_time(self).await
    }

    async fn notify_phase(&self, phase: Phase) -> Result<()> {
        match phase {
            Phase::Day => self.set_day_phase().await,
            Phase::Night => self.set_night_phase().await,
        }
    }
}
