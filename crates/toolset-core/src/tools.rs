//! Tool-call plumbing between a language model and the toolset.
//!
//! A model emits a tool call (id, name, JSON arguments); a [`ToolExecutor`]
//! runs it and hands back a [`ToolResult`] whose content is sent to the model
//! verbatim. Executors never fail out-of-band: every outcome, including an
//! unknown tool, is a `ToolResult`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Outcome of one tool call, ready to hand back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the tool call this answers.
    pub tool_call_id: String,
    /// Serialized result envelope.
    pub content: String,
    pub success: bool,
}

impl ToolResult {
    pub fn success(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            success: true,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            success: false,
        }
    }

    /// Build a result from a JSON envelope, taking `success` from the
    /// envelope itself. A missing or non-boolean flag counts as failure.
    pub fn from_envelope(tool_call_id: impl Into<String>, envelope: &Value) -> Self {
        let success = envelope
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Self {
            tool_call_id: tool_call_id.into(),
            content: envelope.to_string(),
            success,
        }
    }

    /// Decode the content back into JSON, if it is JSON.
    pub fn envelope(&self) -> Option<Value> {
        serde_json::from_str(&self.content).ok()
    }
}

/// A tool call emitted by the model.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    /// Decoded argument object.
    pub arguments: HashMap<String, Value>,
}

impl ToolRequest {
    /// Create a request from already-decoded arguments.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a request from the raw argument string of a model tool call.
    ///
    /// Models emit an empty string for tools called without arguments;
    /// that decodes to an empty object. Anything else must be a JSON object.
    pub fn from_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_json: &str,
    ) -> Result<Self, serde_json::Error> {
        let arguments = if arguments_json.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(arguments_json)?
        };
        Ok(Self::new(id, name, arguments))
    }
}

/// Runs tool calls on behalf of a model loop.
///
/// # Example
///
/// ```ignore
/// use toolset_core::{ToolExecutor, ToolRequest, ToolResult};
///
/// struct EchoExecutor;
///
/// #[async_trait]
/// impl ToolExecutor for EchoExecutor {
///     async fn execute(&self, request: ToolRequest) -> ToolResult {
///         let envelope = serde_json::json!({"success": true, "echo": request.arguments});
///         ToolResult::from_envelope(request.id, &envelope)
///     }
///
///     fn supported_tools(&self) -> Vec<&str> {
///         vec!["echo"]
///     }
/// }
/// ```
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool and return the result.
    async fn execute(&self, request: ToolRequest) -> ToolResult;

    /// List the tools this executor supports.
    fn supported_tools(&self) -> Vec<&str>;
}
