//! MCP tools for Figma.
//!
//! Each tool is a thin wrapper: parse parameters, call the plugin relay or
//! the REST client, format the result as text blocks.

pub mod canvas;
pub mod comment;
pub mod file;
pub mod frame;
pub mod page;
pub mod widget;

use figma_api::{FigmaApiError, FigmaClient};
use figma_core::{CommandRelay, PluginResponse, RelayError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::server::Tool;
use crate::{ToolResponse, PLUGIN_HINT};

/// Errors raised inside a tool handler. They never leave the tool layer:
/// every variant is rendered into an `isError` text response.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments failed to parse or validate.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    /// Relay or plugin failure.
    #[error(transparent)]
    Relay(#[from] RelayError),
    /// REST API failure.
    #[error(transparent)]
    Api(#[from] FigmaApiError),
    /// No personal access token was configured.
    #[error("Figma API access is not configured; set FIGMA_PERSONAL_ACCESS_TOKEN")]
    NoApiClient,
}

/// Collaborators shared by all tools.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Plugin relay.
    pub relay: CommandRelay,
    /// REST client, absent when no token is configured.
    pub api: Option<FigmaClient>,
}

impl ToolContext {
    /// Create a context.
    #[must_use]
    pub fn new(relay: CommandRelay, api: Option<FigmaClient>) -> Self {
        Self { relay, api }
    }

    /// The REST client.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NoApiClient`] when no token was configured.
    pub fn api(&self) -> Result<&FigmaClient, ToolError> {
        self.api.as_ref().ok_or(ToolError::NoApiClient)
    }

    /// Send a plugin command and unwrap its result.
    ///
    /// `success: false` responses become [`RelayError::Plugin`].
    pub(crate) async fn plugin(
        &self,
        command: &str,
        params: &impl Serialize,
    ) -> Result<Option<Value>, ToolError> {
        Ok(self.send(command, params).await?.into_result()?)
    }

    /// Like [`plugin`](Self::plugin), with `failure` as the message when the
    /// plugin fails without saying why.
    pub(crate) async fn plugin_or(
        &self,
        command: &str,
        params: &impl Serialize,
        failure: &str,
    ) -> Result<Option<Value>, ToolError> {
        Ok(self.send(command, params).await?.into_result_or(failure)?)
    }

    async fn send(
        &self,
        command: &str,
        params: &impl Serialize,
    ) -> Result<PluginResponse, ToolError> {
        let params = serde_json::to_value(params).map_err(RelayError::from)?;
        Ok(self.relay.send_command(command, params).await?)
    }
}

/// Every tool definition, in listing order.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    let mut tools = canvas::definitions();
    tools.extend(page::definitions());
    tools.extend(file::definitions());
    tools.extend(comment::definitions());
    tools.extend(widget::definitions());
    tools.extend(frame::definitions());
    tools
}

/// Dispatch a `tools/call`. `None` when the tool does not exist.
pub async fn call(ctx: &ToolContext, name: &str, arguments: Value) -> Option<ToolResponse> {
    tracing::debug!(tool = %name, "Tool call");
    if let Some(response) = canvas::call(ctx, name, &arguments).await {
        return Some(response);
    }
    if let Some(response) = page::call(ctx, name, &arguments).await {
        return Some(response);
    }
    if let Some(response) = file::call(ctx, name, &arguments).await {
        return Some(response);
    }
    if let Some(response) = comment::call(ctx, name, &arguments).await {
        return Some(response);
    }
    if let Some(response) = widget::call(ctx, name, &arguments).await {
        return Some(response);
    }
    frame::call(ctx, name, &arguments).await
}

/// Deserialize tool arguments. `null` counts as an empty object.
pub(crate) fn parse<T: DeserializeOwned>(arguments: &Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments.clone()
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Failure of a relay-backed tool: error line plus the plugin hint.
pub(crate) fn plugin_failure(action: &str, err: &ToolError) -> ToolResponse {
    tracing::error!(action, "Plugin tool failed: {}", err);
    ToolResponse::error([format!("Error {action}: {err}"), PLUGIN_HINT.to_string()])
}

/// Failure of a REST-backed tool.
pub(crate) fn api_failure(action: &str, err: &ToolError) -> ToolResponse {
    tracing::error!(action, "Figma API tool failed: {}", err);
    ToolResponse::error([format!("Error {action}: {err}")])
}

/// `JSON.stringify(value, null, 2)` equivalent.
pub(crate) fn pretty(value: &impl Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// `Node ID: …` when the plugin returned an id, `fallback` otherwise.
pub(crate) fn id_line(result: Option<&Value>, label: &str, fallback: &str) -> String {
    match result.and_then(|r| r.get("id")) {
        Some(Value::String(id)) => format!("{label}: {id}"),
        Some(id) if !id.is_null() => format!("{label}: {id}"),
        _ => fallback.to_string(),
    }
}

pub(crate) fn require(condition: bool, message: impl Into<String>) -> Result<(), ToolError> {
    if condition {
        Ok(())
    } else {
        Err(ToolError::InvalidParams(message.into()))
    }
}

/// `#RRGGBB` or `#RRGGBBAA`, case-insensitive.
pub(crate) fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

pub(crate) fn tool(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}
