//! The contract between tools and the home-automation host.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HostError;

/// Automation run modes accepted by the host.
const AUTOMATION_MODES: &[&str] = &["single", "restart", "queued", "parallel"];

/// Current state of a host entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    /// Entity identifier, e.g. `calendar.family`.
    pub entity_id: String,
    /// State string as reported by the host.
    pub state: String,
    /// Entity attributes.
    #[serde(default)]
    pub attributes: Value,
}

impl EntityState {
    /// Domain part of the entity id (`calendar` for `calendar.family`).
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }
}

/// A request to invoke a host service such as `calendar.get_events`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    /// Service data payload.
    pub data: Map<String, Value>,
    /// Ask the host to return the service response.
    pub return_response: bool,
}

impl ServiceCall {
    /// Create a call with an empty payload that returns no response.
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data: Map::new(),
            return_response: false,
        }
    }

    /// Add a field to the service data.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Add a field only when a value is present.
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Request the service response.
    pub fn returning_response(mut self) -> Self {
        self.return_response = true;
        self
    }

    /// `domain.service` label used in logs and errors.
    pub fn label(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }
}

/// Services a host exposes to the tools.
///
/// Every method is a black-box remote call that may block on I/O and may
/// fail. Implementations hold no per-call state; tools treat the host as
/// shared and read-only from their side.
#[async_trait]
pub trait HostServices: Send + Sync {
    /// Look up an entity. `Ok(None)` means the entity does not exist.
    async fn entity_state(&self, entity_id: &str) -> Result<Option<EntityState>, HostError>;

    /// Whether a component/integration is loaded in the host.
    async fn has_component(&self, component: &str) -> Result<bool, HostError>;

    /// Invoke a service. Returns the service response when one was requested
    /// and the service produced it.
    async fn call_service(&self, call: ServiceCall) -> Result<Option<Value>, HostError>;

    /// Validate an automation configuration before it is loaded.
    ///
    /// The default performs a structural check only.
    async fn validate_automation(&self, config: &Value) -> Result<(), HostError> {
        check_automation_config(config)
    }

    /// Current time in the host's timezone.
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Structural validation of an automation configuration.
///
/// Requires non-empty `trigger` and `action` lists, an optional `condition`
/// list and, when present, a known `mode`.
pub fn check_automation_config(config: &Value) -> Result<(), HostError> {
    let object = config
        .as_object()
        .ok_or_else(|| HostError::InvalidConfig("automation must be an object".to_string()))?;

    for key in ["trigger", "action"] {
        match object.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => {}
            Some(Value::Array(_)) => {
                return Err(HostError::InvalidConfig(format!(
                    "'{}' must contain at least one entry",
                    key
                )))
            }
            Some(_) => {
                return Err(HostError::InvalidConfig(format!("'{}' must be a list", key)))
            }
            None => {
                return Err(HostError::InvalidConfig(format!(
                    "required key not provided: '{}'",
                    key
                )))
            }
        }
    }

    if let Some(condition) = object.get("condition") {
        if !condition.is_array() {
            return Err(HostError::InvalidConfig(
                "'condition' must be a list".to_string(),
            ));
        }
    }

    if let Some(mode) = object.get("mode") {
        let valid = mode
            .as_str()
            .map(|m| AUTOMATION_MODES.contains(&m))
            .unwrap_or(false);
        if !valid {
            return Err(HostError::InvalidConfig(format!(
                "invalid mode {}, expected one of {}",
                mode,
                AUTOMATION_MODES.join(", ")
            )));
        }
    }

    Ok(())
}
