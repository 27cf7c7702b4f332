//! Error types for host operations.

use thiserror::Error;

/// Errors returned by a [`crate::HostServices`] implementation.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host could not be reached or refused the connection.
    #[error("Host unavailable: {0}")]
    Unavailable(String),

    /// A service call was rejected or failed inside the host.
    #[error("Service {domain}.{service} failed: {message}")]
    Service {
        domain: String,
        service: String,
        message: String,
    },

    /// A configuration payload (e.g. an automation) did not validate.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure talking to the host.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The host answered with a body that could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    /// Build a [`HostError::Service`] for the given service.
    pub fn service(
        domain: impl Into<String>,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            domain: domain.into(),
            service: service.into(),
            message: message.into(),
        }
    }
}
