//! # Figma MCP Server Library
//!
//! Shared types and functionality for the `figma-mcp-server` binary.
//! This library is used by both the binary and integration tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use figma_core::CommandRelay;
use metrics_exporter_prometheus::PrometheusHandle;

pub mod config;
pub mod health;
pub mod metrics;
pub mod plugin_socket;
pub mod relay_server;
pub mod stdio;
pub mod validation;

pub use config::{Config, ConfigError, Environment};
pub use relay_server::{RelayServer, ServerError};
pub use stdio::run_stdio;

/// Shared state of the relay listener.
#[derive(Clone)]
pub struct AppState {
    /// The command relay fed by plugin sockets.
    pub relay: CommandRelay,
    /// Prometheus handle; `/metrics` answers 503 without one.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create state without a metrics recorder.
    #[must_use]
    pub fn new(relay: CommandRelay) -> Self {
        Self {
            relay,
            metrics: None,
        }
    }

    /// Attach a Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Get a reference to the relay.
    pub fn relay(&self) -> &CommandRelay {
        &self.relay
    }
}
