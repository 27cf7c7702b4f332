//! Tools a home-automation language model can call.
//!
//! This crate provides a [`ToolRegistry`] of tools that an assistant uses to
//! search the web, read pages, run small scripts and act on the home through
//! a [`HostServices`] connection (calendars, automations, media players,
//! travel times).
//!
//! # Architecture
//!
//! Every tool implements [`Tool`] and returns a [`ToolOutput`] envelope: a
//! JSON object that always carries `success`, and `error` plus `error_type`
//! on failure. [`ToolRegistry::invoke`] never fails; errors are folded into
//! the envelope at the registry boundary. [`RegistryToolExecutor`] exposes the
//! same registry to a model loop as a [`toolset_core::ToolExecutor`], with an
//! optional allowlist and per-call timeout.
//!
//! # Built-in Tools
//!
//! ## Information
//! - [`WebSearch`] - Google, Kagi or Bing search through one dispatcher.
//! - [`UrlFetch`] - Fetch a page and extract its title, description and text.
//! - [`CodeExecutor`] - Run JavaScript in an embedded interpreter (opt-in).
//!
//! ## Home
//! - [`CalendarGetEvents`], [`CalendarAddEvent`], [`CalendarUpdateEvent`]
//! - [`CreateAutomation`]
//! - [`MusicFind`], [`MusicPlay`]
//! - [`GetTravelTime`], [`GetTravelDistance`]
//!
//! # Example
//!
//! ```rust,ignore
//! use ai_toolset::{default_registry, ToolsetConfig};
//! use std::collections::HashMap;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ToolsetConfig::from_env()?;
//!     let registry = default_registry(&config)?;
//!
//!     let mut params = HashMap::new();
//!     params.insert("query".to_string(), json!("tokio runtime"));
//!
//!     let output = registry.invoke("web_search", params).await;
//!     println!("{}", output.to_json_string());
//!     Ok(())
//! }
//! ```

pub mod config;
mod error;
mod executor;
mod registry;
pub mod sandbox;
pub mod search;
mod tool;
pub mod tools;

#[cfg(test)]
mod testing;

use std::time::Duration;

pub use config::{ConfigError, ToolsetConfig, TravelConfig};
pub use error::{ErrorKind, ToolError};
pub use executor::{RegistryToolExecutor, ToolPolicy};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolArgs, ToolOutput};
pub use tools::{
    CalendarAddEvent, CalendarGetEvents, CalendarUpdateEvent, CodeExecutor, CreateAutomation,
    GetTravelDistance, GetTravelTime, MusicFind, MusicPlay, UrlFetch, WebSearch,
};
pub use toolset_core::{HostServices, ToolDefinition};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

/// System-prompt fragment announcing the toolset to the model.
pub const API_PROMPT: &str = "You have access to AI Toolset tools for web search, URL fetching, \
automation creation, code execution, calendar management, music playback, and travel time lookups. \
Use these tools to help answer questions and perform tasks.";

/// Create a registry with all built-in tools registered.
///
/// Tools that act on the home need a host; attach one with
/// [`ToolRegistry::set_host`].
pub fn default_registry(config: &ToolsetConfig) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();

    let dispatcher = search::SearchDispatcher::new(
        search::SearchCredentials::from_config(config),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    // Information tools
    registry.register(WebSearch::new(dispatcher, config.max_results));
    registry.register(UrlFetch::new(config.allow_private_urls)?);
    registry.register(CodeExecutor::new(config.enable_code_executor));

    // Home tools
    registry.register(CalendarGetEvents::new());
    registry.register(CalendarAddEvent::new());
    registry.register(CalendarUpdateEvent::new());
    registry.register(CreateAutomation::new());
    registry.register(MusicFind::new());
    registry.register(MusicPlay::new());
    registry.register(GetTravelTime::new(config.travel.clone()));
    registry.register(GetTravelDistance::new(config.travel.clone()));

    Ok(registry)
}
