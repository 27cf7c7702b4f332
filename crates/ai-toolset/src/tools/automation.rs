//! Automation creation tool.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use toolset_core::ServiceCall;
use tracing::{debug, info};

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Builds an automation config, has the host validate it and reloads
/// automations. The config is not written to storage.
///
/// # Parameters
///
/// - `automation_id` (required): Unique id for the automation.
/// - `alias` (required): Display name.
/// - `trigger` (required): List of triggers.
/// - `action` (required): List of actions.
/// - `condition` (optional): List of conditions.
/// - `mode` (optional, default: "single"): single, restart, queued or parallel.
/// - `description` (optional): Free text.
pub struct CreateAutomation;

impl CreateAutomation {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CreateAutomation {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble the automation config from tool arguments.
fn build_config(args: &ToolArgs) -> Result<Value, ToolError> {
    let automation_id = args.get_string("automation_id")?;
    let alias = args.get_string("alias")?;
    let trigger = args.get_array("trigger")?;
    let action = args.get_array("action")?;
    let condition = args.get_array_opt("condition")?;
    let mode = args
        .get_string_opt("mode")?
        .unwrap_or_else(|| "single".to_string());
    let description = args.get_string_opt("description")?;

    let mut config = Map::new();
    config.insert("id".to_string(), Value::String(automation_id));
    config.insert("alias".to_string(), Value::String(alias));
    config.insert("trigger".to_string(), Value::Array(trigger));
    config.insert("action".to_string(), Value::Array(action));
    config.insert("mode".to_string(), Value::String(mode));

    if let Some(condition) = condition.filter(|c| !c.is_empty()) {
        config.insert("condition".to_string(), Value::Array(condition));
    }
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        config.insert("description".to_string(), Value::String(description));
    }

    Ok(Value::Object(config))
}

#[async_trait]
impl Tool for CreateAutomation {
    fn name(&self) -> &str {
        "create_automation"
    }

    fn description(&self) -> &str {
        "Create a new Home Assistant automation. \
         Provide the automation configuration including triggers, conditions, and actions. \
         Returns the automation ID if successful."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "automation_id": {"type": "string", "description": "Unique automation id"},
                "alias": {"type": "string", "description": "Human-readable name"},
                "trigger": {"type": "array", "items": {"type": "object"}, "description": "Triggers"},
                "action": {"type": "array", "items": {"type": "object"}, "description": "Actions"},
                "condition": {"type": "array", "items": {"type": "object"}, "description": "Conditions"},
                "mode": {
                    "type": "string",
                    "enum": ["single", "restart", "queued", "parallel"],
                    "default": "single"
                },
                "description": {"type": "string"}
            },
            "required": ["automation_id", "alias", "trigger", "action"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let config = build_config(&args)?;
        let host = args.require_host(self.name())?;

        debug!("create_automation: {}", config);
        host.validate_automation(&config).await?;

        if !host.has_component("automation").await? {
            return Err(ToolError::NotConfigured(
                "Automation component not loaded".to_string(),
            ));
        }

        host.call_service(ServiceCall::new("automation", "reload")).await?;

        let automation_id = config["id"].clone();
        let alias = config["alias"].as_str().unwrap_or_default().to_string();
        info!("Automation '{}' loaded", alias);

        Ok(ToolOutput::success(json!({
            "automation_id": automation_id,
            "alias": alias,
            "message": format!(
                "Automation '{}' created successfully. \
                 Note: This automation is not persisted to storage. \
                 Use the Home Assistant UI to save it permanently.",
                alias
            ),
        })))
    }
}
