//! # Figma MCP Server
//!
//! MCP over stdio for the LLM client, plus the WebSocket relay the Figma
//! plugin connects to. Binds to localhost by default.

use anyhow::Context;
use clap::Parser;
use figma_api::FigmaClient;
use figma_core::CommandRelay;
use figma_mcp::FigmaMcpServer;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use figma_server::config::{Cli, Config};
use figma_server::metrics;
use figma_server::{run_stdio, AppState, RelayServer};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,figma_server=debug,figma_core=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
/// Logs go to stderr; stdout carries the MCP protocol.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,figma_server=debug,figma_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_cli(Cli::parse()).context("Invalid configuration")?;
    tracing::info!(
        environment = ?config.environment,
        correlation = ?config.relay.correlation,
        timeout_ms = config.relay.command_timeout.as_millis(),
        "Starting Figma MCP server"
    );

    let metrics_handle = metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize Prometheus metrics: {}", e))?;

    let api = match &config.token {
        Some(token) => Some(
            FigmaClient::with_base_url(token.as_str(), &config.api_base_url)
                .context("Invalid Figma API configuration")?,
        ),
        None => {
            tracing::warn!("No Figma access token configured; REST tools are disabled");
            None
        }
    };

    let relay = CommandRelay::new(config.relay.clone());
    let state = AppState::new(relay.clone()).with_metrics(metrics_handle);

    // The MCP side stays useful without the plugin, so a taken port is not fatal.
    let relay_server = match RelayServer::start_with_state(state, config.listen).await {
        Ok(server) => Some(server),
        Err(e) => {
            tracing::error!("{}; plugin tools will report no connection", e);
            None
        }
    };

    let mcp = FigmaMcpServer::new(relay, api);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    tracing::info!("Figma MCP server ready on stdio");
    tokio::select! {
        result = run_stdio(mcp, stdin, &mut stdout) => {
            result.context("MCP stdio transport failed")?;
            tracing::info!("stdin closed, shutting down");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    if let Some(server) = relay_server {
        server.shutdown().await;
    }
    Ok(())
}
