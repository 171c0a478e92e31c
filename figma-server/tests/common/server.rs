//! Test server harness for integration tests.
//!
//! Starts a real relay listener on a free port so tests can connect as the
//! Figma plugin with a WebSocket client.

use std::net::SocketAddr;
use std::time::Duration;

use figma_core::{CommandRelay, RelayConfig};
use figma_server::RelayServer;

/// A test server instance with control handles.
pub struct TestServer {
    relay: CommandRelay,
    server: RelayServer,
}

impl TestServer {
    /// Start a relay listener with a short command timeout.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn start() -> Self {
        Self::with_config(RelayConfig::default().with_timeout(Duration::from_secs(2))).await
    }

    /// Start a relay listener with the given relay configuration.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn with_config(config: RelayConfig) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let relay = CommandRelay::new(config);
        let server = RelayServer::start(relay.clone(), addr)
            .await
            .expect("failed to bind");

        Self { relay, server }
    }

    /// Get the server's socket address.
    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// WebSocket URL the plugin connects to.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr())
    }

    /// Plain HTTP URL for `path`.
    #[allow(dead_code)]
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr())
    }

    /// The relay behind the listener.
    pub fn relay(&self) -> &CommandRelay {
        &self.relay
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(self) {
        self.server.shutdown().await;
    }
}

/// Poll `condition` until it holds or a second passes.
#[allow(dead_code)]
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
