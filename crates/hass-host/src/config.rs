//! Connection settings for a Home Assistant instance.

use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default Home Assistant base URL.
pub const DEFAULT_URL: &str = "http://localhost:8123";

/// Default timeout for REST calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading connection settings.
#[derive(Debug, Error)]
pub enum HassConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Configuration for [`crate::HassClient`].
#[derive(Debug, Clone)]
pub struct HassConfig {
    /// Base URL of the instance, e.g. `http://homeassistant.local:8123`.
    pub url: Url,

    /// Long-lived access token.
    pub token: String,

    /// Timeout for each REST call.
    pub timeout: Duration,
}

impl HassConfig {
    /// Create a configuration for the given instance.
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self, HassConfigError> {
        let mut url = Url::parse(url).map_err(|e| HassConfigError::Invalid {
            key: "url",
            reason: e.to_string(),
        })?;
        // Relative joins replace the last segment unless the path ends in '/'.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(Self {
            url,
            token: token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `HASS_TOKEN` - Long-lived access token
    ///
    /// Optional environment variables:
    /// - `HASS_URL` - Base URL (default: http://localhost:8123)
    /// - `HASS_TIMEOUT_SECS` - REST call timeout (default: 30)
    pub fn from_env() -> Result<Self, HassConfigError> {
        let token = env::var("HASS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(HassConfigError::Missing("HASS_TOKEN"))?;

        let url = env::var("HASS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());

        let timeout_secs = match env::var("HASS_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| HassConfigError::Invalid {
                key: "HASS_TIMEOUT_SECS",
                reason: format!("'{}' is not a number of seconds", raw),
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(&url, token)?.with_timeout(Duration::from_secs(timeout_secs)))
    }

    /// Builder-style setter for the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve an API path against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, HassConfigError> {
        self.url
            .join(path.trim_start_matches('/'))
            .map_err(|e| HassConfigError::Invalid {
                key: "url",
                reason: e.to_string(),
            })
    }
}
