//! Page tools. Reads go through the plugin when one is connected and fall
//! back to the REST API otherwise; writes need the plugin.

use serde::Deserialize;
use serde_json::{json, Value};

use super::canvas::not_connected;
use super::{api_failure, id_line, parse, pretty, tool, ToolContext, ToolError};
use crate::server::Tool;
use crate::ToolResponse;

#[derive(Debug, Deserialize)]
struct GetPagesParams {
    #[serde(default)]
    file_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetPageParams {
    #[serde(default)]
    file_key: Option<String>,
    page_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatePageParams {
    page_name: String,
}

#[derive(Debug, Deserialize)]
struct SwitchPageParams {
    page_id: String,
}

const FILE_KEY_REQUIRED: &str = "Error: file_key is required when using API method";

/// Dispatch page tools.
pub async fn call(ctx: &ToolContext, name: &str, args: &Value) -> Option<ToolResponse> {
    let response = match name {
        "get_pages" => get_pages(ctx, args).await,
        "get_page" => get_page(ctx, args).await,
        "create_page" => create_page(ctx, args).await,
        "switch_page" => switch_page(ctx, args).await,
        _ => return None,
    };
    Some(response)
}

/// Ask the plugin first; `None` means "use the REST fallback".
async fn from_plugin(ctx: &ToolContext, command: &str, params: &Value) -> Option<Value> {
    if !ctx.relay.is_connected() {
        return None;
    }
    match ctx.plugin(command, params).await {
        Ok(Some(result)) if !result.is_null() => Some(result),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(command, "Plugin request failed, falling back to API: {}", e);
            None
        }
    }
}

fn page_list(pages: impl Iterator<Item = (String, String)>) -> (usize, String) {
    let lines: Vec<String> = pages
        .map(|(name, id)| format!("- {name} (ID: {id})"))
        .collect();
    (lines.len(), lines.join("\n"))
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

async fn get_pages(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: GetPagesParams = parse(args)?;

        if let Some(result) = from_plugin(ctx, "get-pages", &json!({})).await {
            let pages = result.as_array().cloned().unwrap_or_default();
            let (count, list) = page_list(
                pages
                    .iter()
                    .map(|p| (str_field(p, "name").to_string(), str_field(p, "id").to_string())),
            );
            return Ok(ToolResponse::success([
                "# Pages in Figma File".to_string(),
                format!("Found {count} pages:"),
                list,
            ]));
        }

        let Some(file_key) = params.file_key else {
            return Ok(ToolResponse::error([FILE_KEY_REQUIRED]));
        };
        let file = ctx.api()?.get_file(&file_key, Some(1)).await?;
        let (count, list) = page_list(
            file.document
                .children
                .iter()
                .map(|p| (p.name.clone(), p.id.clone())),
        );
        Ok::<_, ToolError>(ToolResponse::success([
            format!("# Pages in Figma File: {}", file.name),
            format!("Found {count} pages:"),
            list,
        ]))
    };
    run.await
        .unwrap_or_else(|e| api_failure("getting pages", &e))
}

fn page_summary(page: &Value) -> ToolResponse {
    let elements = page
        .get("children")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    ToolResponse::success([
        format!("# Page: {}", str_field(page, "name")),
        format!("ID: {}", str_field(page, "id")),
        format!("Type: {}", str_field(page, "type")),
        format!("Elements: {elements}"),
        format!("```json\n{}\n```", pretty(page)),
    ])
}

async fn get_page(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: GetPageParams = parse(args)?;

        let request = json!({ "page_id": params.page_id });
        if let Some(page) = from_plugin(ctx, "get-page", &request).await {
            return Ok(page_summary(&page));
        }

        let Some(file_key) = params.file_key else {
            return Ok(ToolResponse::error([FILE_KEY_REQUIRED]));
        };
        let nodes = ctx
            .api()?
            .get_file_nodes(&file_key, &[params.page_id.as_str()])
            .await?;
        match nodes.nodes.get(&params.page_id).and_then(Option::as_ref) {
            Some(entry) => {
                let page = serde_json::to_value(&entry.document).unwrap_or_default();
                Ok(page_summary(&page))
            }
            None => Ok::<_, ToolError>(ToolResponse::error([format!(
                "Page {} not found in file {file_key}",
                params.page_id
            )])),
        }
    };
    run.await
        .unwrap_or_else(|e| api_failure("getting page", &e))
}

async fn create_page(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: CreatePageParams = parse(args)?;
        super::require(!params.page_name.is_empty(), "page_name must not be empty")?;
        if !ctx.relay.is_connected() {
            return Ok(not_connected());
        }
        let result = ctx
            .plugin_or(
                "create-page",
                &json!({ "name": params.page_name }),
                "Failed to create page",
            )
            .await?;
        Ok::<_, ToolError>(ToolResponse::success([
            "# Page Created Successfully".to_string(),
            format!("A new page named \"{}\" has been created.", params.page_name),
            id_line(result.as_ref(), "Page ID", "Creation successful"),
        ]))
    };
    run.await
        .unwrap_or_else(|e| api_failure("creating page", &e))
}

async fn switch_page(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: SwitchPageParams = parse(args)?;
        if !ctx.relay.is_connected() {
            return Ok(not_connected());
        }
        // The plugin expects `id`, not `page_id`.
        let result = ctx
            .plugin_or(
                "switch-page",
                &json!({ "id": params.page_id }),
                "Failed to switch page",
            )
            .await?;
        let current = result
            .as_ref()
            .and_then(|r| r.get("name"))
            .and_then(Value::as_str)
            .map_or_else(|| "Switch successful".to_string(), |name| format!("Current page: {name}"));
        Ok::<_, ToolError>(ToolResponse::success([
            "# Page Switched Successfully".to_string(),
            format!("Successfully switched to page with ID: {}", params.page_id),
            current,
        ]))
    };
    run.await
        .unwrap_or_else(|e| api_failure("switching page", &e))
}

/// Page tool definitions.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "get_pages",
            "List the pages of the open Figma document (plugin) or of a file (API)",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "description": "The Figma file key to retrieve pages from (only needed for API access)" }
                }
            }),
        ),
        tool(
            "get_page",
            "Get a page and its elements",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "description": "The Figma file key to retrieve from (only needed for API access)" },
                    "page_id": { "type": "string", "description": "The ID of the page to retrieve" }
                },
                "required": ["page_id"]
            }),
        ),
        tool(
            "create_page",
            "Create a new page in the open Figma document",
            json!({
                "type": "object",
                "properties": {
                    "page_name": { "type": "string", "minLength": 1, "description": "Name for the new page" }
                },
                "required": ["page_name"]
            }),
        ),
        tool(
            "switch_page",
            "Switch the open Figma document to another page",
            json!({
                "type": "object",
                "properties": {
                    "page_id": { "type": "string", "description": "The ID of the page to switch to" }
                },
                "required": ["page_id"]
            }),
        ),
    ]
}
