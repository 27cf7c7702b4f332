//! Configuration for the toolset.
//!
//! Configuration is read once at startup, either from environment variables
//! or from a config-entry JSON object, and never mutated afterwards.

use std::env;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Default number of search results.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Upper bound accepted for the configured default result count.
pub const MAX_CONFIGURED_RESULTS: usize = 10;

/// Default HTTP timeout for search provider requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing {0}")]
    Missing(String),

    #[error("Invalid configuration entry: {0}")]
    Entry(#[from] serde_json::Error),
}

/// Travel-time lookup settings passed to the travel service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TravelConfig {
    pub region: String,
    pub units: String,
    pub vehicle_type: String,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            region: "us".to_string(),
            units: "imperial".to_string(),
            vehicle_type: "car".to_string(),
        }
    }
}

/// Configuration for the toolset.
///
/// Field names match the keys stored in a config entry, so an entry's data
/// object deserializes directly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolsetConfig {
    /// Google Custom Search API key.
    pub google_api_key: Option<String>,

    /// Google Programmable Search Engine id.
    pub google_cx: Option<String>,

    /// Kagi API key.
    pub kagi_api_key: Option<String>,

    /// Bing Search subscription key.
    pub bing_api_key: Option<String>,

    /// Default number of search results when the caller does not ask.
    pub max_results: usize,

    /// Allow the code executor tool to run scripts.
    pub enable_code_executor: bool,

    /// HTTP timeout for search provider requests, in seconds.
    pub request_timeout_secs: u64,

    /// Allow url_fetch to reach private and loopback addresses.
    pub allow_private_urls: bool,

    /// Travel-time lookup settings.
    pub travel: TravelConfig,
}

impl Default for ToolsetConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cx: None,
            kagi_api_key: None,
            bing_api_key: None,
            max_results: DEFAULT_MAX_RESULTS,
            enable_code_executor: false,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            allow_private_urls: false,
            travel: TravelConfig::default(),
        }
    }
}

impl ToolsetConfig {
    /// Create configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `AI_TOOLSET_GOOGLE_API_KEY` / `AI_TOOLSET_GOOGLE_CX` - Google Custom Search
    /// - `AI_TOOLSET_KAGI_API_KEY` - Kagi search
    /// - `AI_TOOLSET_BING_API_KEY` - Bing search
    /// - `AI_TOOLSET_MAX_RESULTS` - Default result count (default: 5)
    /// - `AI_TOOLSET_ENABLE_CODE_EXECUTOR` - Enable code execution (default: false)
    /// - `AI_TOOLSET_REQUEST_TIMEOUT_SECS` - Search HTTP timeout (default: 30)
    /// - `AI_TOOLSET_ALLOW_PRIVATE_URLS` - Let url_fetch reach private hosts (default: false)
    /// - `AI_TOOLSET_TRAVEL_REGION` / `AI_TOOLSET_TRAVEL_UNITS` /
    ///   `AI_TOOLSET_TRAVEL_VEHICLE_TYPE` - Travel lookup settings
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let travel_defaults = TravelConfig::default();

        let max_results = match env_opt("AI_TOOLSET_MAX_RESULTS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "AI_TOOLSET_MAX_RESULTS".to_string(),
                reason: format!("'{}' is not a positive integer", raw),
            })?,
            None => defaults.max_results,
        };

        let request_timeout_secs = match env_opt("AI_TOOLSET_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "AI_TOOLSET_REQUEST_TIMEOUT_SECS".to_string(),
                reason: format!("'{}' is not a positive integer", raw),
            })?,
            None => defaults.request_timeout_secs,
        };

        let config = Self {
            google_api_key: env_opt("AI_TOOLSET_GOOGLE_API_KEY"),
            google_cx: env_opt("AI_TOOLSET_GOOGLE_CX"),
            kagi_api_key: env_opt("AI_TOOLSET_KAGI_API_KEY"),
            bing_api_key: env_opt("AI_TOOLSET_BING_API_KEY"),
            max_results,
            enable_code_executor: env_flag("AI_TOOLSET_ENABLE_CODE_EXECUTOR"),
            request_timeout_secs,
            allow_private_urls: env_flag("AI_TOOLSET_ALLOW_PRIVATE_URLS"),
            travel: TravelConfig {
                region: env_opt("AI_TOOLSET_TRAVEL_REGION").unwrap_or(travel_defaults.region),
                units: env_opt("AI_TOOLSET_TRAVEL_UNITS").unwrap_or(travel_defaults.units),
                vehicle_type: env_opt("AI_TOOLSET_TRAVEL_VEHICLE_TYPE")
                    .unwrap_or(travel_defaults.vehicle_type),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from a config-entry data object.
    pub fn from_entry(data: &Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(data.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and credential pairs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_results == 0 || self.max_results > MAX_CONFIGURED_RESULTS {
            return Err(ConfigError::InvalidValue {
                key: "max_results".to_string(),
                reason: format!("must be between 1 and {}", MAX_CONFIGURED_RESULTS),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if is_set(&self.google_api_key) && !is_set(&self.google_cx) {
            return Err(ConfigError::Missing(
                "google_cx (required with google_api_key)".to_string(),
            ));
        }

        Ok(())
    }

    /// Builder-style setter for the code executor switch.
    pub fn with_code_executor(mut self, enabled: bool) -> Self {
        self.enable_code_executor = enabled;
        self
    }

    /// Builder-style setter for Google credentials.
    pub fn with_google(mut self, api_key: impl Into<String>, cx: impl Into<String>) -> Self {
        self.google_api_key = Some(api_key.into());
        self.google_cx = Some(cx.into());
        self
    }

    /// Builder-style setter for the Kagi key.
    pub fn with_kagi(mut self, api_key: impl Into<String>) -> Self {
        self.kagi_api_key = Some(api_key.into());
        self
    }

    /// Builder-style setter for the Bing key.
    pub fn with_bing(mut self, api_key: impl Into<String>) -> Self {
        self.bing_api_key = Some(api_key.into());
        self
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .ok()
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ToolsetConfig::default();
        assert_eq!(config.max_results, 5);
        assert!(!config.enable_code_executor);
        assert_eq!(config.travel.region, "us");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_entry() {
        let data = json!({
            "default_search_engine": "kagi",
            "kagi_api_key": "kg-123",
            "max_results": 8,
            "enable_code_executor": true
        });
        let config = ToolsetConfig::from_entry(&data).unwrap();
        assert_eq!(config.kagi_api_key.as_deref(), Some("kg-123"));
        assert_eq!(config.max_results, 8);
        assert!(config.enable_code_executor);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_max_results_range() {
        let data = json!({"bing_api_key": "b", "max_results": 0});
        assert!(matches!(
            ToolsetConfig::from_entry(&data),
            Err(ConfigError::InvalidValue { .. })
        ));

        let data = json!({"bing_api_key": "b", "max_results": 11});
        assert!(ToolsetConfig::from_entry(&data).is_err());
    }

    #[test]
    fn test_google_requires_cx() {
        let data = json!({"google_api_key": "key"});
        let err = ToolsetConfig::from_entry(&data).unwrap_err();
        assert!(err.to_string().contains("google_cx"));
    }
}
