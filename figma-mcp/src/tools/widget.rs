//! REST-backed widget tools.
//!
//! Widgets are `WIDGET` nodes; their synced state is a JSON document stored
//! as a string in the node's `widgetSync` property.

use figma_api::node::nodes_by_type;
use figma_api::Node;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{api_failure, parse, pretty, require, tool, ToolContext, ToolError};
use crate::server::Tool;
use crate::ToolResponse;

const WIDGET: &str = "WIDGET";

#[derive(Debug, Deserialize)]
struct FileKeyParams {
    file_key: String,
}

#[derive(Debug, Deserialize)]
struct WidgetParams {
    file_key: String,
    node_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchWidgetsParams {
    file_key: String,
    property_key: String,
    #[serde(default)]
    property_value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WidgetBasics<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "type")]
    node_type: &'a str,
    widget_id: &'a str,
}

#[derive(Debug, Serialize)]
struct WidgetPlacement {
    x: Value,
    y: Value,
    width: Value,
    height: Value,
    rotation: Value,
}

/// Dispatch widget tools.
pub async fn call(ctx: &ToolContext, name: &str, args: &Value) -> Option<ToolResponse> {
    let response = match name {
        "get_widgets" => get_widgets(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting widgets", &e)),
        "get_widget" => get_widget(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting widget", &e)),
        "get_widget_sync_data" => get_widget_sync_data(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting widget sync data", &e)),
        "search_widgets" => search_widgets(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("searching widgets", &e)),
        "analyze_widget_structure" => analyze_widget_structure(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("analyzing widget", &e)),
        _ => return None,
    };
    Some(response)
}

/// Raw `widgetSync` string. Empty counts as absent.
fn widget_sync(node: &Node) -> Option<&str> {
    node.extra
        .get("widgetSync")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn widget_id(node: &Node) -> &str {
    node.extra
        .get("widgetId")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown")
}

fn number_or_zero(node: &Node, key: &str) -> Value {
    node.extra
        .get(key)
        .filter(|v| v.is_number())
        .cloned()
        .unwrap_or_else(|| json!(0))
}

/// Text of a sync-data property as shown in listings: strings bare,
/// everything else as compact JSON.
fn display_property(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a widget's sync data carries `key`, optionally equal to `expected`.
///
/// Numbers and booleans compare by their text; objects and arrays by their
/// compact JSON.
fn sync_data_matches(sync: &Value, key: &str, expected: Option<&str>) -> bool {
    let Some(data) = sync.as_object() else {
        return false;
    };
    match expected {
        None => data.contains_key(key),
        Some(expected) => match data.get(key) {
            Some(Value::String(s)) => s == expected,
            Some(v @ (Value::Number(_) | Value::Bool(_) | Value::Object(_) | Value::Array(_))) => {
                v.to_string() == expected
            }
            Some(Value::Null) | None => false,
        },
    }
}

fn not_a_widget(params: &WidgetParams) -> ToolResponse {
    ToolResponse::error([format!(
        "Node {} not found in file {} or is not a widget",
        params.node_id, params.file_key
    )])
}

fn json_block(value: &impl Serialize) -> String {
    format!("```json\n{}\n```", pretty(value))
}

/// Fetch `node_id` and keep it only if it is a widget.
async fn fetch_widget(ctx: &ToolContext, params: &WidgetParams) -> Result<Option<Node>, ToolError> {
    require(!params.file_key.is_empty(), "file_key must not be empty")?;
    require(!params.node_id.is_empty(), "node_id must not be empty")?;
    let mut nodes = ctx
        .api()?
        .get_file_nodes(&params.file_key, &[params.node_id.as_str()])
        .await?;
    Ok(nodes
        .nodes
        .remove(&params.node_id)
        .flatten()
        .map(|entry| entry.document)
        .filter(|node| node.node_type == WIDGET))
}

async fn get_widgets(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: FileKeyParams = parse(args)?;
    require(!params.file_key.is_empty(), "file_key must not be empty")?;
    let file = ctx.api()?.get_file(&params.file_key, None).await?;
    let widgets = nodes_by_type(&file, WIDGET);

    if widgets.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No widgets found in file {}",
            params.file_key
        )]));
    }

    let list = widgets
        .iter()
        .enumerate()
        .map(|(i, node)| {
            format!(
                "{}. **{}** (ID: {})\n   - Widget ID: {}\n   - Widget Sync Data: {}",
                i + 1,
                node.name,
                node.id,
                widget_id(node),
                if widget_sync(node).is_some() { "Available" } else { "None" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ToolResponse::success([
        format!("# Widgets in file {}", params.file_key),
        format!("Found {} widgets:", widgets.len()),
        list,
    ]))
}

async fn get_widget(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: WidgetParams = parse(args)?;
    let Some(node) = fetch_widget(ctx, &params).await? else {
        return Ok(not_a_widget(&params));
    };

    let sync_section = match widget_sync(&node).map(serde_json::from_str::<Value>) {
        Some(Ok(data)) => format!("\n\n## Widget Sync Data\n{}", json_block(&data)),
        Some(Err(_)) => "\n\n## Widget Sync Data\nError parsing widget sync data".to_string(),
        None => String::new(),
    };
    let has_sync = if widget_sync(&node).is_some() { "Yes" } else { "No" };

    Ok(ToolResponse::success([
        format!("# Widget: {}", node.name),
        format!("ID: {}", node.id),
        format!("Widget ID: {}", widget_id(&node)),
        format!("Has Sync Data: {has_sync}{sync_section}"),
    ]))
}

async fn get_widget_sync_data(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: WidgetParams = parse(args)?;
    let Some(node) = fetch_widget(ctx, &params).await? else {
        return Ok(not_a_widget(&params));
    };
    let Some(raw) = widget_sync(&node) else {
        return Ok(ToolResponse::success([format!(
            "Widget {} does not have any sync data",
            params.node_id
        )]));
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(data) => Ok(ToolResponse::success([
            format!("# Widget Sync Data for \"{}\"", node.name),
            format!("Widget ID: {}", node.id),
            json_block(&data),
        ])),
        Err(e) => {
            tracing::warn!(node_id = %node.id, "Unparsable widget sync data: {}", e);
            Ok(ToolResponse::error([format!(
                "Error parsing widget sync data: {e}"
            )]))
        }
    }
}

async fn search_widgets(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: SearchWidgetsParams = parse(args)?;
    require(!params.file_key.is_empty(), "file_key must not be empty")?;
    require(!params.property_key.is_empty(), "property_key must not be empty")?;
    let file = ctx.api()?.get_file(&params.file_key, None).await?;

    let key = params.property_key.as_str();
    let expected = params.property_value.as_deref();
    let matches: Vec<(&Node, Value)> = nodes_by_type(&file, WIDGET)
        .into_iter()
        .filter_map(|node| {
            let data: Value = serde_json::from_str(widget_sync(node)?).ok()?;
            sync_data_matches(&data, key, expected).then_some((node, data))
        })
        .collect();

    let filter = match expected.filter(|v| !v.is_empty()) {
        Some(value) => format!("property \"{key}\" = \"{value}\""),
        None => format!("property \"{key}\""),
    };

    if matches.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No widgets found with {filter}"
        )]));
    }

    let list = matches
        .iter()
        .enumerate()
        .map(|(i, (node, data))| {
            format!(
                "{}. **{}** (ID: {})\n   - Property \"{key}\": {}",
                i + 1,
                node.name,
                node.id,
                display_property(&data[key])
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ToolResponse::success([
        format!("# Widgets with {filter}"),
        format!("Found {} matching widgets:", matches.len()),
        list,
    ]))
}

async fn analyze_widget_structure(
    ctx: &ToolContext,
    args: &Value,
) -> Result<ToolResponse, ToolError> {
    let params: WidgetParams = parse(args)?;
    let Some(node) = fetch_widget(ctx, &params).await? else {
        return Ok(not_a_widget(&params));
    };

    let basics = WidgetBasics {
        id: &node.id,
        name: &node.name,
        node_type: &node.node_type,
        widget_id: widget_id(&node),
    };
    let placement = WidgetPlacement {
        x: number_or_zero(&node, "x"),
        y: number_or_zero(&node, "y"),
        width: number_or_zero(&node, "width"),
        height: number_or_zero(&node, "height"),
        rotation: number_or_zero(&node, "rotation"),
    };
    let sync_data = widget_sync(&node).map(|raw| {
        serde_json::from_str::<Value>(raw)
            .unwrap_or_else(|_| json!({ "error": "Invalid sync data format" }))
    });

    Ok(ToolResponse::success([
        format!("# Widget Analysis: {}", node.name),
        "## Basic Information".to_string(),
        json_block(&basics),
        "## Placement".to_string(),
        json_block(&placement),
        "## Sync Data".to_string(),
        sync_data.map_or_else(|| "No sync data available".to_string(), |d| json_block(&d)),
    ]))
}

fn widget_schema(node_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "file_key": { "type": "string", "minLength": 1, "description": "The Figma file key" },
            "node_id": { "type": "string", "minLength": 1, "description": node_description }
        },
        "required": ["file_key", "node_id"]
    })
}

/// Widget tool definitions.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "get_widgets",
            "List every widget in a Figma file",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "minLength": 1, "description": "The Figma file key to retrieve widgets from" }
                },
                "required": ["file_key"]
            }),
        ),
        tool(
            "get_widget",
            "Get a widget node and its sync data",
            widget_schema("The ID of the widget node"),
        ),
        tool(
            "get_widget_sync_data",
            "Get the synchronized state of a widget",
            widget_schema("The ID of the widget node"),
        ),
        tool(
            "search_widgets",
            "Find widgets whose sync data has a property, optionally with a given value",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "minLength": 1, "description": "The Figma file key" },
                    "property_key": { "type": "string", "minLength": 1, "description": "The sync data property key to search for" },
                    "property_value": { "type": "string", "description": "Optional property value to match (if not provided, returns all widgets with the property)" }
                },
                "required": ["file_key", "property_key"]
            }),
        ),
        tool(
            "analyze_widget_structure",
            "Analyze a widget's identity, placement and sync data",
            widget_schema("The ID of the widget node"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_presence_without_value() {
        let data = json!({ "count": 3, "label": null });
        assert!(sync_data_matches(&data, "count", None));
        assert!(sync_data_matches(&data, "label", None));
        assert!(!sync_data_matches(&data, "missing", None));
        assert!(!sync_data_matches(&json!([1, 2]), "0", None));
    }

    #[test]
    fn property_values_compare_as_text() {
        let data = json!({
            "status": "done",
            "count": 3,
            "pinned": true,
            "tags": ["a", "b"],
            "owner": null
        });
        assert!(sync_data_matches(&data, "status", Some("done")));
        assert!(!sync_data_matches(&data, "status", Some("Done")));
        assert!(sync_data_matches(&data, "count", Some("3")));
        assert!(sync_data_matches(&data, "pinned", Some("true")));
        assert!(sync_data_matches(&data, "tags", Some(r#"["a","b"]"#)));
        assert!(!sync_data_matches(&data, "owner", Some("null")));
    }

    #[test]
    fn listing_shows_strings_bare() {
        assert_eq!(display_property(&json!("done")), "done");
        assert_eq!(display_property(&json!(3)), "3");
        assert_eq!(display_property(&json!({ "a": 1 })), r#"{"a":1}"#);
    }
}
