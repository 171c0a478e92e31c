//! # Plugin Wire Protocol
//!
//! JSON text frames exchanged with the Figma plugin.
//!
//! ### Plugin -> Relay
//!
//! - `{"type": "figma-plugin-connected", "pluginId": "..."}`
//! - `{"type": "figma-plugin-response", "command": "...", "success": true, "result": {...}, "error": "...", "id": "..."}`
//!
//! ### Relay -> Plugin
//!
//! - `{"type": "mcp-command", "command": "...", "params": {...}, "id": "..."}`
//!
//! `id` only appears when the relay runs in request-id correlation mode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

/// Outbound message type tag.
pub const MCP_COMMAND: &str = "mcp-command";

/// Plugin-to-relay message types.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PluginMessage {
    /// Plugin announces itself; its socket becomes the active connection.
    #[serde(rename = "figma-plugin-connected")]
    Connected {
        /// Optional plugin identifier, only used for logging.
        #[serde(default, rename = "pluginId")]
        plugin_id: Option<String>,
    },
    /// Response to a previously relayed command.
    #[serde(rename = "figma-plugin-response")]
    Response {
        /// Command name the response belongs to.
        command: String,
        /// Request id echoed back by plugins that support correlation.
        #[serde(default)]
        id: Option<String>,
        /// Whether the plugin executed the command.
        #[serde(default)]
        success: bool,
        /// Command result.
        #[serde(default)]
        result: Option<Value>,
        /// Plugin-side error message.
        #[serde(default)]
        error: Option<String>,
    },
    /// Any other message type. Logged and ignored.
    #[serde(other)]
    Unknown,
}

/// Relay-to-plugin command message.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundCommand<'a> {
    /// Always [`MCP_COMMAND`].
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Command name, e.g. `create-rectangle`.
    pub command: &'a str,
    /// Command-specific parameters, passed through unvalidated.
    pub params: &'a Value,
    /// Correlation id (request-id mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
}

impl<'a> OutboundCommand<'a> {
    /// Create a command message.
    #[must_use]
    pub fn new(command: &'a str, params: &'a Value, id: Option<&'a str>) -> Self {
        Self {
            kind: MCP_COMMAND,
            command,
            params,
            id,
        }
    }
}

/// The `{success, result, error}` triple a plugin response resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Whether the plugin executed the command.
    pub success: bool,
    /// Command result (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Plugin-side error message (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginResponse {
    /// Convert into the command result, mapping `success: false` to
    /// [`RelayError::Plugin`] with the plugin's own message.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Plugin`] when the plugin reported a failure.
    pub fn into_result(self) -> Result<Option<Value>, RelayError> {
        self.into_result_or("Unknown error")
    }

    /// Like [`into_result`](Self::into_result), with `fallback` as the
    /// message when the plugin reports failure without one.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Plugin`] when `success` is false.
    pub fn into_result_or(self, fallback: &str) -> Result<Option<Value>, RelayError> {
        if self.success {
            Ok(self.result)
        } else {
            Err(RelayError::Plugin(
                self.error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}
