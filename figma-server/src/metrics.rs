//! Prometheus metrics for figma-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use figma_core::RelayStats;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const WS_CONNECTIONS_ACTIVE: &str = "figma_ws_connections_active";
const WS_MESSAGES_TOTAL: &str = "figma_ws_messages_total";
const VALIDATION_FAILURES_TOTAL: &str = "figma_validation_failures_total";
const MCP_REQUESTS_TOTAL: &str = "figma_mcp_requests_total";
const PLUGIN_CONNECTED: &str = "figma_plugin_connected";
const PENDING_COMMANDS: &str = "figma_relay_pending_commands";
const RELAY_COMMANDS_TOTAL: &str = "figma_relay_commands_total";
const RELAY_RESPONSES_TOTAL: &str = "figma_relay_responses_total";
const RELAY_TIMEOUTS_TOTAL: &str = "figma_relay_timeouts_total";
const RELAY_CONNECTION_FAILURES_TOTAL: &str = "figma_relay_connection_failures_total";
const RELAY_UNMATCHED_TOTAL: &str = "figma_relay_unmatched_responses_total";
const RELAY_MALFORMED_TOTAL: &str = "figma_relay_malformed_messages_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Increment active WebSocket connections.
pub fn inc_ws_connections() {
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement active WebSocket connections.
pub fn dec_ws_connections() {
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a WebSocket message.
///
/// # Arguments
///
/// * `direction` - "inbound" or "outbound"
/// * `outcome` - How the relay classified it (see `MessageOutcome::as_str`)
pub fn record_ws_message(direction: &str, outcome: &str) {
    counter!(
        WS_MESSAGES_TOTAL,
        "direction" => direction.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a rejected plugin frame.
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

/// Record an MCP request by method.
pub fn record_mcp_request(method: &str) {
    counter!(MCP_REQUESTS_TOTAL, "method" => method.to_string()).increment(1);
}

/// Publish a relay snapshot. Called right before rendering `/metrics`.
#[allow(clippy::cast_precision_loss)]
pub fn record_relay_state(stats: RelayStats, connected: bool, pending: usize) {
    gauge!(PLUGIN_CONNECTED).set(if connected { 1.0 } else { 0.0 });
    gauge!(PENDING_COMMANDS).set(pending as f64);
    counter!(RELAY_COMMANDS_TOTAL).absolute(stats.commands_sent);
    counter!(RELAY_RESPONSES_TOTAL).absolute(stats.responses_resolved);
    counter!(RELAY_TIMEOUTS_TOTAL).absolute(stats.timeouts);
    counter!(RELAY_CONNECTION_FAILURES_TOTAL).absolute(stats.connection_failures);
    counter!(RELAY_UNMATCHED_TOTAL).absolute(stats.unmatched_responses);
    counter!(RELAY_MALFORMED_TOTAL).absolute(stats.malformed_messages);
}
