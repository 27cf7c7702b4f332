//! Tool trait definition and types.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolset_core::{HostServices, ToolDefinition};

use crate::error::ToolError;

/// Arguments passed to a tool for execution.
#[derive(Clone)]
pub struct ToolArgs {
    /// Parameters as key-value pairs.
    pub params: HashMap<String, Value>,
    /// Host connection for tools that call host services.
    pub host: Option<Arc<dyn HostServices>>,
}

impl ToolArgs {
    /// Create new tool arguments with the given parameters.
    pub fn new(params: HashMap<String, Value>) -> Self {
        Self { params, host: None }
    }

    /// Create tool arguments with a host connection.
    pub fn with_host(params: HashMap<String, Value>, host: Arc<dyn HostServices>) -> Self {
        Self {
            params,
            host: Some(host),
        }
    }

    /// The host connection, or a configuration error naming the tool.
    pub fn require_host(&self, tool: &str) -> Result<&Arc<dyn HostServices>, ToolError> {
        self.host
            .as_ref()
            .ok_or_else(|| ToolError::NotConfigured(format!("{} requires a host connection", tool)))
    }

    /// Get a string parameter, returning an error if missing or not a string.
    pub fn get_string(&self, key: &str) -> Result<String, ToolError> {
        self.params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))?
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ToolError::invalid(key, "expected string"))
    }

    /// Get an optional string parameter.
    ///
    /// `null` counts as absent; any other non-string value is an error.
    pub fn get_string_opt(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ToolError::invalid(key, "expected string")),
        }
    }

    /// Get an optional boolean parameter.
    pub fn get_bool_opt(&self, key: &str) -> Result<Option<bool>, ToolError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| ToolError::invalid(key, "expected boolean")),
        }
    }

    /// Get an optional integer parameter.
    ///
    /// Whole-valued floats such as `5.0` are accepted.
    pub fn get_int_opt(&self, key: &str) -> Result<Option<i64>, ToolError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => {
                if let Some(i) = v.as_i64() {
                    return Ok(Some(i));
                }
                match v.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                    _ => Err(ToolError::invalid(key, "expected integer")),
                }
            }
        }
    }

    /// Get an integer parameter with a default value.
    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64, ToolError> {
        Ok(self.get_int_opt(key)?.unwrap_or(default))
    }

    /// Get a list parameter, returning an error if missing or not a list.
    pub fn get_array(&self, key: &str) -> Result<Vec<Value>, ToolError> {
        self.params
            .get(key)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))?
            .as_array()
            .cloned()
            .ok_or_else(|| ToolError::invalid(key, "expected list"))
    }

    /// Get an optional list parameter.
    pub fn get_array_opt(&self, key: &str) -> Result<Option<Vec<Value>>, ToolError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items.clone())),
            Some(_) => Err(ToolError::invalid(key, "expected list")),
        }
    }

    /// Get an optional object parameter.
    pub fn get_object_opt(&self, key: &str) -> Result<Option<Map<String, Value>>, ToolError> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(_) => Err(ToolError::invalid(key, "expected object")),
        }
    }
}

/// Result envelope returned by every tool.
///
/// Always serializes to a JSON object carrying `success`. Successful outputs
/// carry tool-specific fields; failures carry `error` and `error_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the execution was successful.
    pub success: bool,
    /// Payload or error fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ToolOutput {
    /// Create a successful output from a JSON object.
    ///
    /// Non-object payloads are wrapped under `result`.
    pub fn success(payload: Value) -> Self {
        Self::from_payload(true, payload)
    }

    /// Create a failed output with the given fields.
    pub fn failed(payload: Value) -> Self {
        Self::from_payload(false, payload)
    }

    /// Create a failed output carrying only an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("error".to_string(), Value::String(error.into()));
        Self {
            success: false,
            fields,
        }
    }

    /// Convert a tool error into an in-band failure envelope.
    pub fn from_error(error: &ToolError) -> Self {
        Self::failure(error.to_string()).with("error_type", error.kind().as_str())
    }

    fn from_payload(success: bool, payload: Value) -> Self {
        let mut fields = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };
        fields.remove("success");
        Self { success, fields }
    }

    /// Add or replace a field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The error message, if this is a failure that carries one.
    pub fn error(&self) -> Option<&str> {
        self.fields.get("error").and_then(|v| v.as_str())
    }

    /// The envelope as a JSON value.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert("success".to_string(), Value::Bool(self.success));
        Value::Object(map)
    }

    /// The envelope as a compact JSON string.
    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

impl From<ToolError> for ToolOutput {
    fn from(error: ToolError) -> Self {
        Self::from_error(&error)
    }
}

/// A callable capability exposed to the model.
///
/// Tools hold only immutable configuration; every call is independent.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name (used for dispatch).
    fn name(&self) -> &str;

    /// Natural-language description used by the model for tool selection.
    fn description(&self) -> &str;

    /// JSON Schema object describing the accepted arguments.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;

    /// Function-calling definition for this tool.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.name(), self.description(), self.parameters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        let params = value
            .as_object()
            .map(|m| m.clone().into_iter().collect())
            .unwrap_or_default();
        ToolArgs::new(params)
    }

    #[test]
    fn test_envelope_always_has_success() {
        let output = ToolOutput::success(json!({"query": "rust", "success": false}));
        let value = output.to_value();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["query"], json!("rust"));

        let output = ToolOutput::success(json!(42));
        assert_eq!(output.get("result"), Some(&json!(42)));
    }

    #[test]
    fn test_failure_from_error() {
        let output = ToolOutput::from(ToolError::MissingParameter("code".to_string()));
        assert!(!output.success);
        assert_eq!(output.error(), Some("Missing required parameter: code"));
        assert_eq!(output.get("error_type"), Some(&json!("validation")));
    }

    #[test]
    fn test_envelope_serializes_flat() {
        let output = ToolOutput::failure("boom");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json, json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn test_int_params() {
        let a = args(json!({"timeout": 3, "limit": 5.0, "bad": 2.5, "text": "x"}));
        assert_eq!(a.get_int_opt("timeout").unwrap(), Some(3));
        assert_eq!(a.get_int_opt("limit").unwrap(), Some(5));
        assert_eq!(a.get_int_opt("missing").unwrap(), None);
        assert!(a.get_int_opt("bad").is_err());
        assert!(a.get_int_opt("text").is_err());
        assert_eq!(a.get_int_or("missing", 7).unwrap(), 7);
    }

    #[test]
    fn test_string_params() {
        let a = args(json!({"url": "https://example.com", "engine": null, "n": 1}));
        assert_eq!(a.get_string("url").unwrap(), "https://example.com");
        assert!(matches!(
            a.get_string("nope"),
            Err(ToolError::MissingParameter(_))
        ));
        assert_eq!(a.get_string_opt("engine").unwrap(), None);
        assert!(a.get_string_opt("n").is_err());
    }

    #[test]
    fn test_require_host_missing() {
        let a = args(json!({}));
        let err = a.require_host("music_play").err().unwrap();
        assert_eq!(err.to_string(), "music_play requires a host connection");
    }
}
