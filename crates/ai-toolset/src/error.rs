//! Error types for tool operations.

use std::fmt;

use thiserror::Error;
use toolset_core::HostError;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Missing required parameter.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Invalid parameter value.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Referenced host entity does not exist.
    #[error("{kind} entity '{entity_id}' not found")]
    EntityNotFound { kind: String, entity_id: String },

    /// A date/time or duration argument could not be parsed.
    #[error("Invalid {field} format: {value}")]
    InvalidFormat { field: String, value: String },

    /// A feature is switched off in configuration.
    #[error("{0} is disabled. Enable it in configuration.")]
    Disabled(String),

    /// Configuration does not allow the call to proceed.
    #[error("{0}")]
    NotConfigured(String),

    /// Explicitly requested search engine is not known.
    #[error("Unknown search engine: {0}")]
    UnknownEngine(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A third-party API answered with an error.
    #[error("{provider} failed: {message}")]
    Upstream { provider: String, message: String },

    /// A fetched URL could not be retrieved or decoded.
    #[error("Failed to fetch URL: {0}")]
    Fetch(String),

    /// A host service call failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The call exceeded its time budget.
    #[error("{0}")]
    Timeout(String),

    /// General execution error.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Coarse classification reported to the model alongside an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upstream,
    Configuration,
    Runtime,
    Timeout,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToolError {
    /// Build an [`ToolError::Upstream`] error.
    pub fn upstream(provider: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// Build an [`ToolError::InvalidParameter`] error.
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Which class of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::MissingParameter(_)
            | ToolError::InvalidParameter { .. }
            | ToolError::EntityNotFound { .. }
            | ToolError::InvalidFormat { .. } => ErrorKind::Validation,
            ToolError::Disabled(_) | ToolError::NotConfigured(_) | ToolError::UnknownEngine(_) => {
                ErrorKind::Configuration
            }
            ToolError::Host(HostError::InvalidConfig(_)) => ErrorKind::Validation,
            ToolError::HttpError(e) if e.is_timeout() => ErrorKind::Timeout,
            ToolError::HttpError(_)
            | ToolError::JsonError(_)
            | ToolError::Upstream { .. }
            | ToolError::Fetch(_)
            | ToolError::Host(_) => ErrorKind::Upstream,
            ToolError::ExecutionFailed(_) => ErrorKind::Runtime,
            ToolError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_model_facing() {
        let err = ToolError::EntityNotFound {
            kind: "Calendar".to_string(),
            entity_id: "calendar.work".to_string(),
        };
        assert_eq!(err.to_string(), "Calendar entity 'calendar.work' not found");

        let err = ToolError::Disabled("Code executor".to_string());
        assert_eq!(
            err.to_string(),
            "Code executor is disabled. Enable it in configuration."
        );

        let err = ToolError::UnknownEngine("yahoo".to_string());
        assert_eq!(err.to_string(), "Unknown search engine: yahoo");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            ToolError::MissingParameter("url".to_string()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ToolError::NotConfigured("No search engine configured".to_string()).kind(),
            ErrorKind::Configuration
        );
        let err = ToolError::upstream("Bing search", "HTTP 500 Internal Server Error");
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(
            err.to_string(),
            "Bing search failed: HTTP 500 Internal Server Error"
        );
        assert_eq!(
            ToolError::Host(HostError::InvalidConfig("bad".to_string())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
    }
}
