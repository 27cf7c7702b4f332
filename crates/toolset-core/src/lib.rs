//! Core traits and types shared by the AI Toolset crates.
//!
//! This crate defines the boundary between the tools and the home-automation
//! runtime that hosts them:
//!
//! - [`HostServices`] - The contract a host must implement (entity lookup,
//!   component discovery, service calls, automation validation, clock)
//! - [`ServiceCall`] / [`EntityState`] - Payload types for host calls
//! - [`HostError`] - Error type for host operations
//! - [`ToolExecutor`] / [`ToolRequest`] / [`ToolResult`] - LLM tool-call plumbing
//! - [`ToolDefinition`] - Function-calling schema advertised to the model
//!
//! # Example
//!
//! ```rust
//! use toolset_core::{async_trait, EntityState, HostError, HostServices, ServiceCall};
//! use serde_json::Value;
//!
//! struct NoopHost;
//!
//! #[async_trait]
//! impl HostServices for NoopHost {
//!     async fn entity_state(&self, _entity_id: &str) -> Result<Option<EntityState>, HostError> {
//!         Ok(None)
//!     }
//!
//!     async fn has_component(&self, _component: &str) -> Result<bool, HostError> {
//!         Ok(false)
//!     }
//!
//!     async fn call_service(&self, _call: ServiceCall) -> Result<Option<Value>, HostError> {
//!         Ok(None)
//!     }
//! }
//! ```

mod definition;
mod error;
mod host;
mod tools;

pub use definition::{FunctionDefinition, ToolDefinition};
pub use error::HostError;
pub use host::{check_automation_config, EntityState, HostServices, ServiceCall};
pub use tools::{ToolExecutor, ToolRequest, ToolResult};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
