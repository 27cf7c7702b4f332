//! In-memory host used by the tool tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use toolset_core::{EntityState, HostError, HostServices, ServiceCall};

use crate::tool::ToolArgs;

/// Records service calls and answers from canned responses.
pub struct FakeHost {
    entities: HashMap<String, EntityState>,
    components: HashSet<String>,
    responses: HashMap<String, Value>,
    failures: HashMap<String, String>,
    now: DateTime<FixedOffset>,
    calls: Mutex<Vec<ServiceCall>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            components: HashSet::new(),
            responses: HashMap::new(),
            failures: HashMap::new(),
            now: DateTime::parse_from_rfc3339("2024-03-10T09:30:00+01:00").unwrap(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_entity(mut self, entity_id: &str) -> Self {
        self.entities.insert(
            entity_id.to_string(),
            EntityState {
                entity_id: entity_id.to_string(),
                state: "on".to_string(),
                attributes: Value::Object(Map::new()),
            },
        );
        self
    }

    pub fn with_component(mut self, component: &str) -> Self {
        self.components.insert(component.to_string());
        self
    }

    /// Respond to `domain.service` with `response`.
    pub fn with_response(mut self, service: &str, response: Value) -> Self {
        self.responses.insert(service.to_string(), response);
        self
    }

    /// Make `domain.service` fail with `message`.
    pub fn failing(mut self, service: &str, message: &str) -> Self {
        self.failures.insert(service.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn into_args(self, params: Value) -> (Arc<FakeHost>, ToolArgs) {
        let host = Arc::new(self);
        let params = params
            .as_object()
            .map(|m| m.clone().into_iter().collect())
            .unwrap_or_default();
        let args = ToolArgs::with_host(params, host.clone());
        (host, args)
    }
}

#[async_trait]
impl HostServices for FakeHost {
    async fn entity_state(&self, entity_id: &str) -> Result<Option<EntityState>, HostError> {
        Ok(self.entities.get(entity_id).cloned())
    }

    async fn has_component(&self, component: &str) -> Result<bool, HostError> {
        Ok(self.components.contains(component))
    }

    async fn call_service(&self, call: ServiceCall) -> Result<Option<Value>, HostError> {
        let label = call.label();
        let return_response = call.return_response;
        self.calls.lock().unwrap().push(call);

        if let Some(message) = self.failures.get(&label) {
            let (domain, service) = label.split_once('.').unwrap_or((label.as_str(), ""));
            return Err(HostError::service(domain, service, message.clone()));
        }

        if return_response {
            Ok(self.responses.get(&label).cloned())
        } else {
            Ok(None)
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }
}
