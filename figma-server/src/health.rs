//! Health check endpoints.
//!
//! - `/health/live` - Liveness probe (the process is up)
//! - `/health/ready` - Readiness probe with relay details
//! - `/health` - Same as readiness

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// A plugin has completed the handshake.
    pub plugin_connected: bool,
    /// Commands waiting for a plugin response.
    pub pending_commands: usize,
}

/// Liveness probe - is the server running?
#[tracing::instrument(name = "liveness_probe")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe.
///
/// The listener accepts plugin connections as soon as it is bound, so this
/// is always 200; whether a plugin is attached is reported in `checks`.
#[tracing::instrument(name = "readiness_probe", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let status = HealthStatus {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        checks: HealthChecks {
            plugin_connected: state.relay.is_connected(),
            pending_commands: state.relay.pending_count(),
        },
    };

    (StatusCode::OK, Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figma_core::CommandRelay;

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            status: "healthy",
            version: "0.3.0",
            checks: HealthChecks {
                plugin_connected: false,
                pending_commands: 2,
            },
        };

        let json = serde_json::to_value(&status).expect("should serialize");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["checks"]["plugin_connected"], false);
        assert_eq!(json["checks"]["pending_commands"], 2);
    }

    #[tokio::test]
    async fn test_readiness_reports_relay() {
        let state = AppState::new(CommandRelay::default());
        let (code, Json(status)) = readiness(State(state)).await;
        assert_eq!(code, StatusCode::OK);
        assert!(!status.checks.plugin_connected);
        assert_eq!(status.checks.pending_commands, 0);
    }
}
