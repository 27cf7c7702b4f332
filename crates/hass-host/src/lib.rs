//! Home Assistant host connection for the AI toolset.
//!
//! [`HassClient`] implements [`toolset_core::HostServices`] on top of the
//! Home Assistant REST API (`/api/states`, `/api/config`, `/api/services`),
//! authenticated with a long-lived access token.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hass_host::HassClient;
//!
//! let host = Arc::new(HassClient::from_env()?);
//! registry.set_host(host);
//! ```

mod client;
mod config;

pub use client::HassClient;
pub use config::{HassConfig, HassConfigError, DEFAULT_TIMEOUT_SECS, DEFAULT_URL};
