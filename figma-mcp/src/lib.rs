//! # Figma MCP
//!
//! MCP (Model Context Protocol) tools and resources for Figma.
//!
//! ## MCP Resources
//!
//! - `figma-file://{file_key}` - File summary
//! - `figma-node://{file_key}/{node_id}` - Node summary
//!
//! ## MCP Tools
//!
//! - Canvas (through the plugin relay): `create_rectangle`, `create_circle`,
//!   `create_arc`, `create_polygon`, `create_star`, `create_vector`,
//!   `create_line`, `create_text`, `modify_rectangle`, `get_selection`,
//!   `check_connection`, `get_elements`, `get_element`
//! - Pages: `get_pages`, `get_page`, `create_page`, `switch_page`
//! - Files (REST): `get_file`, `get_node`, `get_images`, `get_file_versions`,
//!   `get_components`, `search_text`
//! - Comments (REST): `get_comments`, `add_comment`
//! - Widgets (REST): `get_widgets`, `get_widget`, `get_widget_sync_data`,
//!   `search_widgets`, `analyze_widget_structure`
//! - Frames: `get_frames` (REST), `get_frame_documentation`
//!
//! Every tool call returns text content. Failures are reported as text with
//! `isError: true`, never as JSON-RPC errors.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod resources;
pub mod server;
pub mod tools;

// Re-export key types for convenience
pub use server::{FigmaMcpServer, JsonRpcRequest, JsonRpcResponse};
pub use tools::{ToolContext, ToolError};

use serde::{Deserialize, Serialize};

/// Remediation hint appended to every relay failure.
pub const PLUGIN_HINT: &str = "Make sure the Figma plugin is running and connected to the MCP server.";

/// One text block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    /// Always `text`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Block contents.
    pub text: String,
}

impl TextContent {
    /// Create a text block.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// MCP tool response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Text blocks, in display order.
    pub content: Vec<TextContent>,
    /// Whether the call failed.
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolResponse {
    /// Create a success response.
    #[must_use]
    pub fn success<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: blocks.into_iter().map(TextContent::new).collect(),
            is_error: false,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_error: true,
            ..Self::success(blocks)
        }
    }

    /// All blocks joined by newlines, for logs and assertions.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_mcp_content_shape() {
        let response = ToolResponse::error(["Error creating rectangle: boom", PLUGIN_HINT]);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["text"], PLUGIN_HINT);
    }
}
