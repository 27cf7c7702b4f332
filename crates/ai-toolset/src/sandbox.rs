//! Sandboxed script execution.
//!
//! Scripts run in an embedded QuickJS interpreter. Each call gets a fresh
//! runtime and context whose globals are the language built-ins (`Math`,
//! `Date`, `JSON`, collections, ...) plus call-scoped output functions:
//!
//! - `print(...)`, `console.log/info/debug(...)` write to the captured stdout
//! - `console.error/warn(...)` write to the captured stderr
//!
//! Nothing else is installed: there is no module loader, no file or process
//! access and no network. This is an allow-list, not a security boundary.
//!
//! # Timeouts
//!
//! The script runs on its own OS thread and the caller waits for it with a
//! wall-clock deadline. When the deadline passes the caller gets a timeout
//! outcome, but the worker thread is not interrupted: a script that never
//! finishes keeps running until the process exits.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use rquickjs::context::EvalOptions;
use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{Context, Ctx, Function, Object, Runtime, Value};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

/// Default wall-clock budget for a script, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default heap limit for one script (64 MiB).
const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Default interpreter stack limit (1 MiB).
const DEFAULT_STACK_LIMIT: usize = 1024 * 1024;

/// Result of running one script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    /// Whether the script ran to completion without throwing.
    pub success: bool,
    /// Everything written to stdout before the script finished or failed.
    pub output: String,
    /// Everything written to stderr, if anything was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    /// Description of the failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the deadline expired before the script finished.
    #[serde(skip)]
    pub timed_out: bool,
}

impl ExecutionOutcome {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            errors: None,
            error: Some(error.into()),
            timed_out: false,
        }
    }

    fn timed_out(timeout_secs: u64) -> Self {
        Self {
            timed_out: true,
            ..Self::failed(format!(
                "Code execution timed out after {} seconds",
                timeout_secs
            ))
        }
    }
}

/// Resource limits applied to every interpreter instance.
#[derive(Debug, Clone, Copy)]
pub struct SandboxLimits {
    pub memory_bytes: usize,
    pub stack_bytes: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_MEMORY_LIMIT,
            stack_bytes: DEFAULT_STACK_LIMIT,
        }
    }
}

/// Runs scripts in isolated interpreter instances.
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    limits: SandboxLimits,
}

impl Sandbox {
    /// Create a sandbox with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sandbox with custom limits.
    pub fn with_limits(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    /// Run `code` with a wall-clock budget of `timeout_secs` seconds.
    pub async fn execute(&self, code: &str, timeout_secs: u64) -> ExecutionOutcome {
        let (tx, rx) = oneshot::channel();
        let code = code.to_string();
        let limits = self.limits;

        let spawned = thread::Builder::new()
            .name("sandbox-worker".to_string())
            .spawn(move || {
                let outcome = run_script(&code, limits);
                // The receiver is gone when the caller already timed out.
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            return ExecutionOutcome::failed(format!("Failed to start sandbox worker: {}", e));
        }

        match tokio::time::timeout(Duration::from_secs(timeout_secs), rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => ExecutionOutcome::failed("Sandbox worker exited without a result"),
            Err(_) => {
                debug!("Script exceeded {}s deadline", timeout_secs);
                ExecutionOutcome::timed_out(timeout_secs)
            }
        }
    }
}

/// Output sinks bound to a single script run.
#[derive(Default)]
struct OutputCapture {
    stdout: Rc<RefCell<String>>,
    stderr: Rc<RefCell<String>>,
}

impl OutputCapture {
    /// Take everything captured so far, leaving the sinks empty.
    fn take(&self) -> (String, String) {
        (
            std::mem::take(&mut *self.stdout.borrow_mut()),
            std::mem::take(&mut *self.stderr.borrow_mut()),
        )
    }
}

fn run_script(code: &str, limits: SandboxLimits) -> ExecutionOutcome {
    let capture = OutputCapture::default();
    let result = evaluate(code, limits, &capture);
    let (output, errors) = capture.take();
    let errors = if errors.is_empty() { None } else { Some(errors) };

    match result {
        Ok(()) => ExecutionOutcome {
            success: true,
            output,
            errors,
            error: None,
            timed_out: false,
        },
        Err(message) => ExecutionOutcome {
            success: false,
            output,
            errors,
            error: Some(message),
            timed_out: false,
        },
    }
}

fn evaluate(code: &str, limits: SandboxLimits, capture: &OutputCapture) -> Result<(), String> {
    let runtime =
        Runtime::new().map_err(|e| format!("Failed to create script runtime: {}", e))?;
    runtime.set_memory_limit(limits.memory_bytes);
    runtime.set_max_stack_size(limits.stack_bytes);

    let context =
        Context::full(&runtime).map_err(|e| format!("Failed to create script context: {}", e))?;

    context.with(|ctx| {
        install_output(&ctx, capture).map_err(|e| describe_error(&ctx, e))?;

        let mut options = EvalOptions::default();
        options.strict = true;

        ctx.eval_with_options::<Value, _>(code, options)
            .map(|_| ())
            .map_err(|e| describe_error(&ctx, e))
    })
}

fn install_output(ctx: &Ctx<'_>, capture: &OutputCapture) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let stdout = capture.stdout.clone();
    globals.set(
        "print",
        Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
            write_line(&stdout, args)
        })?,
    )?;

    let console = Object::new(ctx.clone())?;
    for name in ["log", "info", "debug"] {
        let sink = capture.stdout.clone();
        console.set(
            name,
            Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
                write_line(&sink, args)
            })?,
        )?;
    }
    for name in ["error", "warn"] {
        let sink = capture.stderr.clone();
        console.set(
            name,
            Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
                write_line(&sink, args)
            })?,
        )?;
    }
    globals.set("console", console)?;

    Ok(())
}

fn write_line(sink: &RefCell<String>, args: Rest<Coerced<String>>) {
    let line = args
        .0
        .into_iter()
        .map(|part| part.0)
        .collect::<Vec<_>>()
        .join(" ");
    let mut buffer = sink.borrow_mut();
    buffer.push_str(&line);
    buffer.push('\n');
}

/// Turn an interpreter error into `Name: message`.
fn describe_error(ctx: &Ctx<'_>, error: rquickjs::Error) -> String {
    if !matches!(error, rquickjs::Error::Exception) {
        return error.to_string();
    }

    let thrown = ctx.catch();
    if let Some(exception) = thrown.as_exception() {
        let message = exception.message().unwrap_or_default();
        return match exception.as_object().get::<_, String>("name") {
            Ok(name) if !name.is_empty() => format!("{}: {}", name, message),
            _ => message,
        };
    }

    if let Some(text) = thrown.as_string().and_then(|s| s.to_string().ok()) {
        return text;
    }

    format!("Uncaught {:?} value", thrown.type_of())
}
