//! The listener the Figma plugin connects to.
//!
//! One axum server per relay. It upgrades `/` and `/ws` to plugin sockets
//! and serves health and metrics next to them.

use std::io;
use std::net::SocketAddr;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use figma_core::CommandRelay;
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::health;
use crate::metrics::record_relay_state;
use crate::plugin_socket::handle_plugin_socket;
use crate::AppState;

/// Listener errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("Failed to bind plugin relay on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        source: io::Error,
    },
    /// The bound socket has no local address.
    #[error("Failed to read local address: {0}")]
    LocalAddr(io::Error),
}

impl ServerError {
    /// Whether another listener already owns the port.
    #[must_use]
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, Self::Bind { source, .. } if source.kind() == io::ErrorKind::AddrInUse)
    }
}

/// Build the relay router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(plugin_ws_handler))
        .route("/ws", get(plugin_ws_handler))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                // Request ID for log correlation
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                ),
        )
        .with_state(state)
}

/// A running relay listener.
pub struct RelayServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RelayServer {
    /// Bind `addr` and start accepting plugin connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] when the address cannot be bound; a
    /// second listener on the same port fails with `AddrInUse`.
    pub async fn start(relay: CommandRelay, addr: SocketAddr) -> Result<Self, ServerError> {
        Self::start_with_state(AppState::new(relay), addr).await
    }

    /// Like [`RelayServer::start`], with explicit state (metrics handle).
    ///
    /// # Errors
    ///
    /// See [`RelayServer::start`].
    pub async fn start_with_state(state: AppState, addr: SocketAddr) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let app = router(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!("Plugin relay server error: {}", e);
            }
        });

        tracing::info!("Figma plugin relay listening on ws://{}", local_addr);

        Ok(Self {
            addr: local_addr,
            shutdown_tx: Some(shutdown_tx),
            handle,
        })
    }

    /// The bound address (useful with port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the server task.
    ///
    /// Open plugin sockets are not force-closed; they end when the peer
    /// closes or the runtime shuts down.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), &mut self.handle).await;
        tracing::info!("Figma plugin relay stopped");
    }
}

/// Plugin WebSocket upgrade.
#[tracing::instrument(name = "plugin_connect", skip(ws, state))]
async fn plugin_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Plugin WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_plugin_socket(socket, state.relay))
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(state))]
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let Some(handle) = state.metrics.as_ref() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed".to_string());
    };
    let relay = &state.relay;
    record_relay_state(relay.stats(), relay.is_connected(), relay.pending_count());
    (StatusCode::OK, handle.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_listener_on_same_port_fails() {
        let relay = CommandRelay::default();
        let first = RelayServer::start(relay.clone(), SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("first bind");

        let err = RelayServer::start(relay, first.local_addr())
            .await
            .err()
            .expect("second bind must fail");
        assert!(err.is_addr_in_use(), "{err}");

        first.shutdown().await;
    }
}
