//! Code executor tool running JavaScript in the embedded sandbox.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{ErrorKind, ToolError};
use crate::sandbox::{Sandbox, DEFAULT_TIMEOUT_SECS};
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// Tool that evaluates a script and reports its captured output.
///
/// Disabled unless `enable_code_executor` is set. The sandbox exposes no file,
/// network or process access, but it is not a security boundary.
///
/// # Parameters
///
/// - `code` (required): JavaScript source, evaluated in strict mode.
/// - `timeout` (optional, default: 5): Seconds before the caller gives up.
///
/// # Examples
///
/// ```json
/// {"code": "print(Math.sqrt(2))"}
/// {"code": "for (let i = 0; i < 3; i++) console.log(i)", "timeout": 2}
/// ```
pub struct CodeExecutor {
    sandbox: Sandbox,
    enabled: bool,
}

impl CodeExecutor {
    pub fn new(enabled: bool) -> Self {
        Self {
            sandbox: Sandbox::new(),
            enabled,
        }
    }

    /// Use a custom sandbox, e.g. with different resource limits.
    pub fn with_sandbox(enabled: bool, sandbox: Sandbox) -> Self {
        Self { sandbox, enabled }
    }
}

#[async_trait]
impl Tool for CodeExecutor {
    fn name(&self) -> &str {
        "code_executor"
    }

    fn description(&self) -> &str {
        "Execute JavaScript code in a sandboxed environment. \
         Use this for calculations, data processing, or testing code snippets. \
         Use print() or console.log() to produce output. \
         Returns the output and any errors."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string", "description": "JavaScript source to run"},
                "timeout": {
                    "type": "integer",
                    "description": "Time limit in seconds",
                    "default": DEFAULT_TIMEOUT_SECS
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        if !self.enabled {
            return Err(ToolError::Disabled("Code executor".to_string()));
        }

        let code = args.get_string("code")?;
        let timeout = args.get_int_or("timeout", DEFAULT_TIMEOUT_SECS as i64)?;
        if timeout <= 0 {
            return Err(ToolError::invalid("timeout", "must be a positive number of seconds"));
        }

        debug!("code_executor: {} bytes, timeout={}s", code.len(), timeout);

        let outcome = self.sandbox.execute(&code, timeout as u64).await;

        if outcome.timed_out {
            warn!("Code execution timed out after {} seconds", timeout);
            let message = outcome.error.clone().unwrap_or_default();
            return Err(ToolError::Timeout(message));
        }

        let payload = serde_json::to_value(&outcome)?;
        if outcome.success {
            Ok(ToolOutput::success(payload))
        } else {
            Ok(ToolOutput::failed(payload).with("error_type", ErrorKind::Runtime.as_str()))
        }
    }
}
