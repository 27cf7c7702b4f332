//! Tool registry for managing and executing tools.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use toolset_core::{HostServices, ToolDefinition, ToolRequest};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, ToolError};
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Registry for managing tools.
///
/// Tools are kept in registration order, so definitions are listed to the
/// model in a stable order. The registry also owns the optional host
/// connection handed to every call.
pub struct ToolRegistry {
    /// Registered tools by name.
    tools: IndexMap<String, Arc<dyn Tool>>,
    /// Host connection for tools that call host services.
    host: Option<Arc<dyn HostServices>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
            host: None,
        }
    }

    /// Create a registry bound to a host.
    pub fn with_host(host: Arc<dyn HostServices>) -> Self {
        Self {
            tools: IndexMap::new(),
            host: Some(host),
        }
    }

    /// Set the host connection.
    pub fn set_host(&mut self, host: Arc<dyn HostServices>) {
        self.host = Some(host);
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_shared(Arc::new(tool));
    }

    /// Register an already shared tool.
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        info!("Registering tool: {}", name);
        self.tools.insert(name, tool);
    }

    /// Registered tool names, in registration order.
    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get tool descriptions for help text.
    pub fn get_descriptions(&self) -> Vec<(&str, &str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// Function-calling definitions for every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool by name with the given parameters.
    pub async fn execute(
        &self,
        name: &str,
        params: HashMap<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!("Executing tool '{}' with {} params", name, params.len());

        let args = match &self.host {
            Some(host) => ToolArgs::with_host(params, host.clone()),
            None => ToolArgs::new(params),
        };

        let result = tool.execute(args).await?;

        debug!("Tool '{}' completed: success={}", name, result.success);

        Ok(result)
    }

    /// Execute a tool and fold any error into a failure envelope.
    pub async fn invoke(&self, name: &str, params: HashMap<String, Value>) -> ToolOutput {
        match self.execute(name, params).await {
            Ok(output) => output,
            Err(error) => {
                match error.kind() {
                    ErrorKind::Upstream | ErrorKind::Timeout | ErrorKind::Runtime => {
                        warn!("Tool '{}' failed: {}", name, error)
                    }
                    _ => debug!("Tool '{}' rejected call: {}", name, error),
                }
                ToolOutput::from_error(&error)
            }
        }
    }

    /// Execute a tool with JSON arguments string.
    ///
    /// An empty string counts as no arguments.
    pub async fn execute_json(&self, name: &str, args_json: &str) -> Result<ToolOutput, ToolError> {
        let request = ToolRequest::from_call(String::new(), name, args_json)?;
        self.execute(name, request.arguments).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use async_trait::async_trait;
    use serde_json::json;

    /// Reports the state of one host entity.
    struct EntityStateTool;

    #[async_trait]
    impl Tool for EntityStateTool {
        fn name(&self) -> &str {
            "entity_state"
        }

        fn description(&self) -> &str {
            "Report the state of an entity"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"entity_id": {"type": "string"}},
                "required": ["entity_id"]
            })
        }

        async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
            let entity_id = args.get_string("entity_id")?;
            let host = args.require_host(self.name())?;
            let state = host
                .entity_state(&entity_id)
                .await?
                .ok_or_else(|| ToolError::EntityNotFound {
                    kind: "Light".to_string(),
                    entity_id: entity_id.clone(),
                })?;
            Ok(ToolOutput::success(json!({
                "entity_id": entity_id,
                "state": state.state,
            })))
        }
    }

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "Does nothing"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::success(Value::Null))
        }
    }

    fn params(value: Value) -> HashMap<String, Value> {
        value
            .as_object()
            .map(|m| m.clone().into_iter().collect())
            .unwrap_or_default()
    }

    fn home_registry() -> ToolRegistry {
        let host = FakeHost::new().with_entity("light.porch");
        let mut registry = ToolRegistry::with_host(Arc::new(host));
        registry.register(EntityStateTool);
        registry
    }

    #[test]
    fn test_lookup() {
        let registry = home_registry();
        assert!(registry.has_tool("entity_state"));
        assert!(registry.get("entity_state").is_some());
        assert!(!registry.has_tool("light_toggle"));
        assert_eq!(
            registry.get_descriptions(),
            vec![("entity_state", "Report the state of an entity")]
        );
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(NamedTool(name));
        }
        registry.register(NamedTool("alpha"));
        assert_eq!(registry.list_tools(), vec!["zeta", "alpha", "mid"]);

        let names: Vec<_> = registry
            .definitions()
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_execute_passes_host() {
        let output = home_registry()
            .execute("entity_state", params(json!({"entity_id": "light.porch"})))
            .await
            .unwrap();
        assert_eq!(output.to_value(), json!({"success": true, "entity_id": "light.porch", "state": "on"}));
    }

    #[tokio::test]
    async fn test_execute_without_host() {
        let mut registry = ToolRegistry::new();
        registry.register(EntityStateTool);

        let err = registry
            .execute("entity_state", params(json!({"entity_id": "light.porch"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "entity_state requires a host connection");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_execute_json() {
        let registry = home_registry();

        let output = registry
            .execute_json("entity_state", r#"{"entity_id": "light.porch"}"#)
            .await
            .unwrap();
        assert_eq!(output.get("state"), Some(&json!("on")));

        let result = registry.execute_json("entity_state", "  ").await;
        assert!(matches!(result, Err(ToolError::MissingParameter(_))));

        let result = registry.execute_json("entity_state", "{not json").await;
        assert!(matches!(result, Err(ToolError::JsonError(_))));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = home_registry().execute("light_toggle", HashMap::new()).await;
        assert!(matches!(result, Err(ToolError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invoke_folds_errors() {
        let registry = home_registry();

        let output = registry.invoke("entity_state", HashMap::new()).await;
        assert_eq!(
            output.to_value(),
            json!({
                "success": false,
                "error": "Missing required parameter: entity_id",
                "error_type": "validation"
            })
        );

        let output = registry
            .invoke("entity_state", params(json!({"entity_id": "light.attic"})))
            .await;
        assert_eq!(output.error(), Some("Light entity 'light.attic' not found"));
        assert_eq!(output.get("error_type"), Some(&json!("validation")));

        let output = registry.invoke("light_toggle", HashMap::new()).await;
        assert_eq!(output.get("error_type"), Some(&json!("not_found")));
    }
}
