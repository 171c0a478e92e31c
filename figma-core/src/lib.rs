//! # Figma Core
//!
//! The command relay that turns one long-lived plugin WebSocket into a
//! request/response channel for MCP tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  send_command   ┌───────────────┐  mcp-command   ┌──────────────┐
//! │  MCP tools   │ ──────────────▶ │ CommandRelay  │ ─────────────▶ │ Figma plugin │
//! │ (figma-mcp)  │ ◀────────────── │  - active     │ ◀───────────── │  (browser)   │
//! └──────────────┘  PluginResponse │  - pending    │ plugin-response└──────────────┘
//!                                  └───────────────┘
//! ```
//!
//! The relay knows nothing about sockets: a connection is an outbound
//! `mpsc` queue plus an id. `figma-server` pumps WebSocket frames in and out.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod protocol;
pub mod relay;

pub use error::{RelayError, RelayResult};
pub use protocol::{OutboundCommand, PluginMessage, PluginResponse};
pub use relay::{
    CommandRelay, ConnectionHandle, ConnectionId, CorrelationMode, MessageOutcome, RelayConfig,
    RelayStats, DEFAULT_COMMAND_TIMEOUT,
};

/// Figma core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
