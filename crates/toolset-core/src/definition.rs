//! Function-calling definitions advertised to the model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition in the OpenAI-style function-calling format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool type (always "function" for function tools).
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function specification.
    pub function: FunctionDefinition,
}

/// Function definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function.
    pub name: String,
    /// Description of what the function does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the function parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a function tool definition.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters,
            },
        }
    }

    /// Names of the required parameters declared by the schema.
    pub fn required_parameters(&self) -> Vec<&str> {
        self.function
            .parameters
            .get("required")
            .and_then(|r| r.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_definition_serializes() {
        let tool = ToolDefinition::function(
            "url_fetch",
            "Fetch a web page",
            json!({
                "type": "object",
                "properties": {"url": {"type": "string"}},
                "required": ["url"]
            }),
        );

        assert_eq!(tool.tool_type, "function");
        assert_eq!(tool.required_parameters(), vec!["url"]);

        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "url_fetch");
    }
}
