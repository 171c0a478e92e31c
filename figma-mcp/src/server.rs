//! MCP server implementation for Figma.
//!
//! Implements JSON-RPC 2.0 protocol for MCP tool calls and resource access.
//! Transport-agnostic: the caller feeds parsed requests and writes back the
//! responses (see `figma-server`'s stdio loop).

use figma_api::FigmaClient;
use figma_core::CommandRelay;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::resources;
use crate::tools::{self, ToolContext};

/// Protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name announced in `initialize`.
pub const SERVER_NAME: &str = "figma-mcp";

/// JSON-RPC error codes.
pub mod codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Resource not found.
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
}

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    #[serde(default)]
    pub jsonrpc: String,
    /// Request ID. Absent for notifications; an explicit `null` is kept.
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

/// A member that is present, `null` included, is `Some`. Absence is
/// handled by `#[serde(default)]`.
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    /// Create a request with an id.
    #[must_use]
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Whether this is a notification (no response expected).
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request ID (matches request).
    pub id: Value,
    /// Result (on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i32,
    /// Error message.
    pub message: String,
    /// Additional data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// Input schema (JSON Schema).
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// MCP resource definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Resource URI.
    pub uri: String,
    /// Resource name.
    pub name: String,
    /// Resource description.
    pub description: String,
    /// MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// MCP server for Figma.
#[derive(Debug, Clone)]
pub struct FigmaMcpServer {
    ctx: ToolContext,
}

impl FigmaMcpServer {
    /// Create a server over a relay and an optional REST client.
    #[must_use]
    pub fn new(relay: CommandRelay, api: Option<FigmaClient>) -> Self {
        Self {
            ctx: ToolContext::new(relay, api),
        }
    }

    /// Shared tool collaborators.
    #[must_use]
    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Handle a JSON-RPC request. `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!("MCP request: {} {:?}", request.method, request.params);

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "MCP notification");
            return None;
        };

        let response = match request.method.as_str() {
            // MCP standard methods
            "initialize" => Self::handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tools::definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            "resources/list" => {
                JsonRpcResponse::success(id, json!({ "resources": resources::list() }))
            }
            "resources/templates/list" => JsonRpcResponse::success(
                id,
                json!({ "resourceTemplates": resources::templates() }),
            ),
            "resources/read" => self.handle_resources_read(id, &request.params).await,

            // Unknown method
            _ => JsonRpcResponse::error(
                id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    fn handle_initialize(id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                },
                "capabilities": {
                    "tools": {},
                    "resources": {}
                }
            }),
        )
    }

    async fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or_default();

        match tools::call(&self.ctx, name, arguments).await {
            Some(result) => {
                if result.is_error {
                    tracing::debug!(tool = %name, "Tool returned error: {}", result.text());
                }
                let value = serde_json::to_value(&result).unwrap_or_default();
                JsonRpcResponse::success(id, value)
            }
            None => JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Unknown tool: {name}"),
            ),
        }
    }

    async fn handle_resources_read(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let Some(uri) = params.get("uri").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, codes::INVALID_PARAMS, "Missing resource uri");
        };

        match resources::read(&self.ctx, uri).await {
            Some(contents) => JsonRpcResponse::success(id, json!({ "contents": contents })),
            None => JsonRpcResponse::error(
                id,
                codes::RESOURCE_NOT_FOUND,
                format!("Resource not found: {uri}"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figma_core::RelayConfig;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn offline_server() -> FigmaMcpServer {
        FigmaMcpServer::new(CommandRelay::default(), None)
    }

    async fn call_tool(server: &FigmaMcpServer, name: &str, arguments: Value) -> Value {
        let response = server
            .handle_request(JsonRpcRequest::new(
                1,
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
            ))
            .await
            .expect("response");
        assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
        response.result.expect("result")
    }

    fn text_of(result: &Value) -> String {
        result["content"]
            .as_array()
            .expect("content")
            .iter()
            .filter_map(|c| c["text"].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn api_server(mock: &MockServer) -> FigmaMcpServer {
        let client = FigmaClient::with_base_url("test-token", &format!("{}/v1", mock.uri()))
            .expect("client");
        FigmaMcpServer::new(CommandRelay::default(), Some(client))
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = offline_server();
        let response = server
            .handle_request(JsonRpcRequest::new(1, "initialize", json!({})))
            .await
            .expect("response");

        assert!(response.error.is_none());
        let result = response.result.expect("result");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = offline_server();
        let response = server
            .handle_request(JsonRpcRequest::new(1, "tools/list", json!({})))
            .await
            .expect("response");

        let result = response.result.expect("result");
        let tools = result["tools"].as_array().expect("tools");
        assert_eq!(tools.len(), 32);
        assert!(tools
            .iter()
            .all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let server = offline_server();
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
                .expect("parse");
        assert!(request.is_notification());
        assert!(server.handle_request(request).await.is_none());
    }

    #[tokio::test]
    async fn null_id_is_a_request_not_a_notification() {
        let server = offline_server();
        let request: JsonRpcRequest =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": null, "method": "ping"}))
                .expect("parse");
        assert!(!request.is_notification());
        assert_eq!(request.id, Some(Value::Null));

        let response = server.handle_request(request).await.expect("response");
        assert_eq!(response.id, Value::Null);
        assert!(response.result.is_some());
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let server = offline_server();
        let response = server
            .handle_request(JsonRpcRequest::new(7, "bogus/method", json!({})))
            .await
            .expect("response");
        assert_eq!(response.id, json!(7));
        assert_eq!(response.error.expect("error").code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let server = offline_server();
        let response = server
            .handle_request(JsonRpcRequest::new(
                2,
                "tools/call",
                json!({ "name": "does_not_exist" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.error.expect("error").code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn check_connection_reports_disconnected() {
        let server = offline_server();
        let result = call_tool(&server, "check_connection", json!({})).await;
        assert_eq!(result["isError"], false);
        assert!(text_of(&result).contains("❌"));
    }

    #[tokio::test]
    async fn relay_tool_without_plugin_reports_hint() {
        let server = offline_server();
        let result = call_tool(&server, "create_rectangle", json!({})).await;
        assert_eq!(result["isError"], true);
        let text = text_of(&result);
        assert!(text.contains("No active Figma plugin connection"), "{text}");
        assert!(text.contains(crate::PLUGIN_HINT));
    }

    #[tokio::test]
    async fn rectangle_round_trips_through_plugin() {
        let relay = CommandRelay::new(RelayConfig::default().with_timeout(Duration::from_secs(2)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = relay.register_connection(tx);
        relay.handle_message(&handle, r#"{"type":"figma-plugin-connected","pluginId":"test"}"#);

        let plugin_relay = relay.clone();
        let plugin = tokio::spawn(async move {
            let frame = rx.recv().await.expect("command frame");
            let command: Value = serde_json::from_str(&frame).expect("json");
            assert_eq!(command["type"], "mcp-command");
            assert_eq!(command["command"], "create-rectangle");
            assert_eq!(command["params"]["width"], 200.0);
            let reply = json!({
                "type": "figma-plugin-response",
                "command": "create-rectangle",
                "success": true,
                "result": { "id": "12:34" }
            });
            plugin_relay.handle_message(&handle, &reply.to_string());
        });

        let server = FigmaMcpServer::new(relay, None);
        let result = call_tool(
            &server,
            "create_rectangle",
            json!({ "x": 10, "y": 20, "width": 200, "height": 50, "color": "#00ff00" }),
        )
        .await;
        plugin.await.expect("plugin task");

        assert_eq!(result["isError"], false);
        let text = text_of(&result);
        assert!(text.contains("# Rectangle Created Successfully"), "{text}");
        assert!(text.contains("Node ID: 12:34"), "{text}");
    }

    #[tokio::test]
    async fn silent_page_failures_name_the_action() {
        let relay = CommandRelay::new(RelayConfig::default().with_timeout(Duration::from_secs(2)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = relay.register_connection(tx);
        relay.handle_message(&handle, r#"{"type":"figma-plugin-connected"}"#);

        let plugin_relay = relay.clone();
        let plugin = tokio::spawn(async move {
            for _ in 0..2 {
                let frame = rx.recv().await.expect("command frame");
                let command: Value = serde_json::from_str(&frame).expect("json");
                let reply = json!({
                    "type": "figma-plugin-response",
                    "command": command["command"],
                    "success": false
                });
                plugin_relay.handle_message(&handle, &reply.to_string());
            }
        });

        let server = FigmaMcpServer::new(relay, None);
        let created = call_tool(&server, "create_page", json!({ "page_name": "Specs" })).await;
        let switched = call_tool(&server, "switch_page", json!({ "page_id": "2:0" })).await;
        plugin.await.expect("plugin task");

        assert_eq!(created["isError"], true);
        assert!(
            text_of(&created).contains("Error creating page: Failed to create page"),
            "{}",
            text_of(&created)
        );
        assert_eq!(switched["isError"], true);
        assert!(
            text_of(&switched).contains("Error switching page: Failed to switch page"),
            "{}",
            text_of(&switched)
        );
    }

    #[tokio::test]
    async fn api_tool_without_token_reports_configuration() {
        let server = offline_server();
        let result = call_tool(&server, "get_file", json!({ "file_key": "abc" })).await;
        assert_eq!(result["isError"], true);
        assert!(text_of(&result).contains("FIGMA_PERSONAL_ACCESS_TOKEN"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_tool_error() {
        let server = offline_server();
        let result = call_tool(&server, "get_node", json!({ "file_key": "abc" })).await;
        assert_eq!(result["isError"], true);
        assert!(text_of(&result).contains("Invalid parameters"));
    }

    fn sample_file() -> Value {
        json!({
            "name": "Design System",
            "lastModified": "2024-03-01T10:00:00Z",
            "document": {
                "id": "0:0",
                "name": "Document",
                "type": "DOCUMENT",
                "children": [{
                    "id": "0:1",
                    "name": "Page 1",
                    "type": "CANVAS",
                    "children": [{
                        "id": "1:2",
                        "name": "Title",
                        "type": "TEXT",
                        "characters": "Hello World"
                    }, {
                        "id": "1:3",
                        "name": "Body",
                        "type": "TEXT",
                        "characters": "Goodbye"
                    }]
                }]
            },
            "components": { "1:9": { "key": "k", "name": "Button" } },
            "styles": {}
        })
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn get_file_summarizes_document() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/abc"))
            .and(header("X-Figma-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_file()))
            .mount(&mock)
            .await;

        let server = api_server(&mock);
        let result = call_tool(&server, "get_file", json!({ "file_key": "abc" })).await;
        let text = text_of(&result);
        assert_eq!(result["isError"], false);
        assert!(text.contains("# Figma File: Design System"), "{text}");
        assert!(text.contains("Document contains 1 top-level nodes."), "{text}");
        assert!(text.contains("Components: 1"), "{text}");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn search_text_matches_case_insensitively() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_file()))
            .mount(&mock)
            .await;

        let server = api_server(&mock);
        let result = call_tool(
            &server,
            "search_text",
            json!({ "file_key": "abc", "search_text": "hello" }),
        )
        .await;
        let text = text_of(&result);
        assert!(text.contains("Found 1 matching text nodes:"), "{text}");
        assert!(text.contains("Path: Document > Page 1 > Title"), "{text}");
        assert!(!text.contains("Goodbye"));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn get_comments_lists_authors() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/abc/comments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "comments": [{
                    "id": "c1",
                    "message": "Looks good",
                    "created_at": "2024-03-02T09:00:00Z",
                    "user": { "id": "u1", "handle": "ana" }
                }]
            })))
            .mount(&mock)
            .await;

        let server = api_server(&mock);
        let result = call_tool(&server, "get_comments", json!({ "file_key": "abc" })).await;
        let text = text_of(&result);
        assert!(text.contains("Found 1 comments:"), "{text}");
        assert!(text.contains("- **ana** (2024-03-02T09:00:00Z): Looks good"), "{text}");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn api_errors_are_tool_errors() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "status": 404, "err": "Not found" })),
            )
            .mount(&mock)
            .await;

        let server = api_server(&mock);
        let result = call_tool(&server, "get_file", json!({ "file_key": "missing" })).await;
        assert_eq!(result["isError"], true);
        let text = text_of(&result);
        assert!(text.starts_with("Error getting Figma file:"), "{text}");
        assert!(text.contains("Not found"), "{text}");
    }

    #[tokio::test]
    async fn resources_list_and_unknown_uri() {
        let server = offline_server();
        let response = server
            .handle_request(JsonRpcRequest::new(1, "resources/list", json!({})))
            .await
            .expect("response");
        let result = response.result.expect("result");
        assert_eq!(result["resources"][0]["uri"], "figma-file://");

        let response = server
            .handle_request(JsonRpcRequest::new(
                2,
                "resources/read",
                json!({ "uri": "https://example.com" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.error.expect("error").code, codes::RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn file_resource_reads_summary() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_file()))
            .mount(&mock)
            .await;

        let server = api_server(&mock);
        let response = server
            .handle_request(JsonRpcRequest::new(
                3,
                "resources/read",
                json!({ "uri": "figma-file://abc" }),
            ))
            .await
            .expect("response");
        let result = response.result.expect("result");
        let text = result["contents"][0]["text"].as_str().expect("text");
        assert!(text.starts_with("# Design System"), "{text}");
        assert!(text.contains("Components: 1"), "{text}");
    }

    fn widget_file() -> Value {
        json!({
            "name": "Retro Board",
            "document": {
                "id": "0:0",
                "name": "Document",
                "type": "DOCUMENT",
                "children": [{
                    "id": "0:1",
                    "name": "Page 1",
                    "type": "CANVAS",
                    "children": [{
                        "id": "5:1",
                        "name": "Voting",
                        "type": "WIDGET",
                        "widgetId": "w-vote",
                        "widgetSync": "{\"status\":\"open\",\"votes\":3}"
                    }, {
                        "id": "5:2",
                        "name": "Sticky",
                        "type": "WIDGET"
                    }, {
                        "id": "6:1",
                        "name": "Card",
                        "type": "FRAME",
                        "absoluteBoundingBox": { "x": 0, "y": 0, "width": 320, "height": 200 },
                        "children": [{ "id": "6:2", "name": "Label", "type": "TEXT" }]
                    }]
                }]
            }
        })
    }

    async fn mount_widget_file(mock: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/files/board"))
            .respond_with(ResponseTemplate::new(200).set_body_json(widget_file()))
            .mount(mock)
            .await;
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn get_widgets_lists_sync_availability() {
        let mock = MockServer::start().await;
        mount_widget_file(&mock).await;

        let server = api_server(&mock);
        let result = call_tool(&server, "get_widgets", json!({ "file_key": "board" })).await;
        let text = text_of(&result);
        assert_eq!(result["isError"], false);
        assert!(text.contains("# Widgets in file board"), "{text}");
        assert!(text.contains("Found 2 widgets:"), "{text}");
        assert!(
            text.contains("1. **Voting** (ID: 5:1)\n   - Widget ID: w-vote\n   - Widget Sync Data: Available"),
            "{text}"
        );
        assert!(
            text.contains("2. **Sticky** (ID: 5:2)\n   - Widget ID: Unknown\n   - Widget Sync Data: None"),
            "{text}"
        );
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn file_without_widgets_says_so() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_file()))
            .mount(&mock)
            .await;

        let server = api_server(&mock);
        let result = call_tool(&server, "get_widgets", json!({ "file_key": "abc" })).await;
        assert_eq!(text_of(&result), "No widgets found in file abc");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn search_widgets_matches_sync_properties() {
        let mock = MockServer::start().await;
        mount_widget_file(&mock).await;
        let server = api_server(&mock);

        let result = call_tool(
            &server,
            "search_widgets",
            json!({ "file_key": "board", "property_key": "votes", "property_value": "3" }),
        )
        .await;
        let text = text_of(&result);
        assert!(text.contains("# Widgets with property \"votes\" = \"3\""), "{text}");
        assert!(text.contains("Found 1 matching widgets:"), "{text}");
        assert!(text.contains("   - Property \"votes\": 3"), "{text}");

        let result = call_tool(
            &server,
            "search_widgets",
            json!({ "file_key": "board", "property_key": "owner" }),
        )
        .await;
        assert_eq!(text_of(&result), "No widgets found with property \"owner\"");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn widget_sync_data_comes_from_the_node_endpoint() {
        let mock = MockServer::start().await;
        let widget = widget_file()["document"]["children"][0]["children"][0].clone();
        let sticky = widget_file()["document"]["children"][0]["children"][1].clone();
        Mock::given(method("GET"))
            .and(path("/v1/files/board/nodes"))
            .and(query_param("ids", "5:1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "nodes": { "5:1": { "document": widget } } })),
            )
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/files/board/nodes"))
            .and(query_param("ids", "5:2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "nodes": { "5:2": { "document": sticky } } })),
            )
            .mount(&mock)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/files/board/nodes"))
            .and(query_param("ids", "6:1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nodes": { "6:1": { "document": { "id": "6:1", "name": "Card", "type": "FRAME" } } }
            })))
            .mount(&mock)
            .await;
        let server = api_server(&mock);

        let result = call_tool(
            &server,
            "get_widget_sync_data",
            json!({ "file_key": "board", "node_id": "5:1" }),
        )
        .await;
        let text = text_of(&result);
        assert!(text.contains("# Widget Sync Data for \"Voting\""), "{text}");
        assert!(text.contains("Widget ID: 5:1"), "{text}");
        assert!(text.contains("\"votes\": 3"), "{text}");

        let result = call_tool(
            &server,
            "get_widget_sync_data",
            json!({ "file_key": "board", "node_id": "5:2" }),
        )
        .await;
        assert_eq!(text_of(&result), "Widget 5:2 does not have any sync data");

        let result = call_tool(
            &server,
            "analyze_widget_structure",
            json!({ "file_key": "board", "node_id": "5:1" }),
        )
        .await;
        let text = text_of(&result);
        assert!(text.contains("# Widget Analysis: Voting"), "{text}");
        assert!(text.contains("\"widgetId\": \"w-vote\""), "{text}");
        assert!(text.contains("\"rotation\": 0"), "{text}");

        let result = call_tool(
            &server,
            "get_widget",
            json!({ "file_key": "board", "node_id": "6:1" }),
        )
        .await;
        assert_eq!(result["isError"], true);
        assert_eq!(
            text_of(&result),
            "Node 6:1 not found in file board or is not a widget"
        );
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock binds local ports, blocked in some sandboxes"
    )]
    async fn get_frames_reports_size_and_children() {
        let mock = MockServer::start().await;
        mount_widget_file(&mock).await;

        let server = api_server(&mock);
        let result = call_tool(&server, "get_frames", json!({ "file_key": "board" })).await;
        let text = text_of(&result);
        assert!(text.contains("Found 1 frames:"), "{text}");
        assert!(
            text.contains("1. **Card** (ID: 6:1)\n   - Width: 320, Height: 200\n   - Children: 1"),
            "{text}"
        );
    }
}
