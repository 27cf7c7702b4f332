//! ToolExecutor implementation backed by ToolRegistry.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use toolset_core::{ToolExecutor, ToolRequest, ToolResult};
use tokio::time::timeout;
use tracing::warn;

use crate::error::ErrorKind;
use crate::{ToolOutput, ToolRegistry};

/// Per-executor limits on which tools may run and for how long.
#[derive(Debug, Clone, Default)]
pub struct ToolPolicy {
    /// Only these tools may run, when set.
    pub allowlist: Option<HashSet<String>>,
    /// Upper bound on a single tool call.
    pub timeout: Option<Duration>,
}

impl ToolPolicy {
    pub fn allow_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowlist = self.allowlist.get_or_insert_with(HashSet::new);
        for tool in tools {
            allowlist.insert(tool.into());
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn is_allowed(&self, tool: &str) -> bool {
        self.allowlist
            .as_ref()
            .map(|allowed| allowed.contains(tool))
            .unwrap_or(true)
    }
}

/// Exposes a [`ToolRegistry`] to a model loop as a [`ToolExecutor`].
///
/// Result content is always the serialized envelope, for failures too.
pub struct RegistryToolExecutor {
    registry: Arc<ToolRegistry>,
    policy: ToolPolicy,
}

impl RegistryToolExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_policy(registry, ToolPolicy::default())
    }

    pub fn with_policy(registry: ToolRegistry, policy: ToolPolicy) -> Self {
        Self::from_shared(Arc::new(registry), policy)
    }

    pub fn from_shared(registry: Arc<ToolRegistry>, policy: ToolPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.registry.as_ref()
    }

    pub fn policy(&self) -> &ToolPolicy {
        &self.policy
    }

    fn to_result(id: &str, output: &ToolOutput) -> ToolResult {
        ToolResult::from_envelope(id, &output.to_value())
    }
}

#[async_trait::async_trait]
impl ToolExecutor for RegistryToolExecutor {
    async fn execute(&self, request: ToolRequest) -> ToolResult {
        if !self.policy.is_allowed(&request.name) {
            let output = ToolOutput::failure("Tool not allowed")
                .with("error_type", ErrorKind::Configuration.as_str());
            return Self::to_result(&request.id, &output);
        }

        let invocation = self.registry.invoke(&request.name, request.arguments);

        let output = match self.policy.timeout {
            Some(limit) => match timeout(limit, invocation).await {
                Ok(output) => output,
                Err(_) => {
                    warn!("Tool '{}' exceeded {:?}", request.name, limit);
                    ToolOutput::failure("Tool execution timed out")
                        .with("error_type", ErrorKind::Timeout.as_str())
                }
            },
            None => invocation.await,
        };

        Self::to_result(&request.id, &output)
    }

    fn supported_tools(&self) -> Vec<&str> {
        self.registry.list_tools()
    }
}
