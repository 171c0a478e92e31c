//! REST-backed file tools: file and node summaries, image export, versions,
//! components and text search.

use figma_api::node::{node_path, nodes_by_type};
use figma_api::{ImageFormat, ImageOptions};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{api_failure, parse, pretty, require, tool, ToolContext, ToolError};
use crate::server::Tool;
use crate::ToolResponse;

#[derive(Debug, Deserialize)]
struct GetFileParams {
    file_key: String,
    #[serde(default)]
    return_full_file: bool,
}

#[derive(Debug, Deserialize)]
struct FileKeyParams {
    file_key: String,
}

#[derive(Debug, Deserialize)]
struct GetNodeParams {
    file_key: String,
    node_id: String,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
struct GetImagesParams {
    file_key: String,
    node_ids: Vec<String>,
    #[serde(default)]
    format: ImageFormat,
    #[serde(default = "default_scale")]
    scale: f64,
}

#[derive(Debug, Deserialize)]
struct SearchTextParams {
    file_key: String,
    search_text: String,
}

/// Dispatch file tools.
pub async fn call(ctx: &ToolContext, name: &str, args: &Value) -> Option<ToolResponse> {
    let response = match name {
        "get_file" => get_file(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting Figma file", &e)),
        "get_node" => get_node(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting node", &e)),
        "get_images" => get_images(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting images", &e)),
        "get_file_versions" => get_file_versions(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting file versions", &e)),
        "get_components" => get_components(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting components", &e)),
        "search_text" => search_text(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("searching text", &e)),
        _ => return None,
    };
    Some(response)
}

fn non_empty(value: &str, field: &str) -> Result<(), ToolError> {
    require(!value.is_empty(), format!("{field} must not be empty"))
}

async fn get_file(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: GetFileParams = parse(args)?;
    non_empty(&params.file_key, "file_key")?;
    let file = ctx.api()?.get_file(&params.file_key, None).await?;

    if params.return_full_file {
        return Ok(ToolResponse::success([
            format!("Retrieved Figma file: {}", file.name),
            pretty(&file),
        ]));
    }

    Ok(ToolResponse::success([
        format!("# Figma File: {}", file.name),
        format!("Last modified: {}", file.last_modified),
        format!(
            "Document contains {} top-level nodes.",
            file.document.children.len()
        ),
        format!("Components: {}", file.components.len()),
        format!("Component sets: {}", file.component_sets.len()),
        format!("Styles: {}", file.styles.len()),
    ]))
}

async fn get_node(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: GetNodeParams = parse(args)?;
    non_empty(&params.file_key, "file_key")?;
    non_empty(&params.node_id, "node_id")?;
    let nodes = ctx
        .api()?
        .get_file_nodes(&params.file_key, &[params.node_id.as_str()])
        .await?;

    let Some(entry) = nodes.nodes.get(&params.node_id).and_then(Option::as_ref) else {
        return Ok(ToolResponse::error([format!(
            "Node {} not found in file {}",
            params.node_id, params.file_key
        )]));
    };
    let node = &entry.document;

    Ok(ToolResponse::success([
        format!("# Node: {}", node.name),
        format!("Type: {}", node.node_type),
        format!("ID: {}", node.id),
        format!("Children: {}", node.children.len()),
        format!("```json\n{}\n```", pretty(node)),
    ]))
}

async fn get_images(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: GetImagesParams = parse(args)?;
    non_empty(&params.file_key, "file_key")?;
    require(!params.node_ids.is_empty(), "node_ids must contain at least one id")?;
    require(
        (0.01..=4.0).contains(&params.scale),
        "scale must be between 0.01 and 4",
    )?;

    let ids: Vec<&str> = params.node_ids.iter().map(String::as_str).collect();
    let options = ImageOptions {
        format: Some(params.format),
        scale: Some(params.scale),
        ..ImageOptions::default()
    };
    let images = ctx
        .api()?
        .get_images(&params.file_key, &ids, &options)
        .await?;

    if let Some(err) = images.err {
        return Ok(ToolResponse::error([format!("Error getting images: {err}")]));
    }

    let list = images
        .images
        .iter()
        .map(|(node_id, url)| match url {
            Some(url) => format!("- {node_id}: [Image URL]({url})"),
            None => format!("- {node_id}: Error generating image"),
        })
        .collect::<Vec<_>>()
        .join("\n");

    Ok(ToolResponse::success([
        format!("# Images for file {}", params.file_key),
        format!("Format: {}, Scale: {}", params.format, params.scale),
        list,
    ]))
}

async fn get_file_versions(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: FileKeyParams = parse(args)?;
    non_empty(&params.file_key, "file_key")?;
    let versions = ctx.api()?.get_file_versions(&params.file_key).await?.versions;

    if versions.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No versions found for file {}",
            params.file_key
        )]));
    }

    let list = versions
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                "{}. **{}** - {} by {}\n   {}",
                i + 1,
                v.label.as_deref().filter(|l| !l.is_empty()).unwrap_or("Unnamed version"),
                v.created_at,
                v.user.handle,
                v.description
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .unwrap_or("No description")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ToolResponse::success([
        format!("# File Versions for {}", params.file_key),
        format!("Found {} versions:", versions.len()),
        list,
    ]))
}

async fn get_components(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: FileKeyParams = parse(args)?;
    non_empty(&params.file_key, "file_key")?;
    let components = ctx
        .api()?
        .get_file_components(&params.file_key)
        .await?
        .components;

    if components.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No components found in file {}",
            params.file_key
        )]));
    }

    let list = components
        .iter()
        .map(|c| {
            let description = if c.description.is_empty() {
                "No description"
            } else {
                c.description.as_str()
            };
            let origin = if c.remote {
                "(Remote component)"
            } else {
                "(Local component)"
            };
            format!(
                "- **{}** (Key: {})\n  Description: {description}\n  {origin}",
                c.name, c.key
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ToolResponse::success([
        format!("# Components in file {}", params.file_key),
        format!("Found {} components:", components.len()),
        list,
    ]))
}

async fn search_text(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: SearchTextParams = parse(args)?;
    non_empty(&params.file_key, "file_key")?;
    non_empty(&params.search_text, "search_text")?;
    let file = ctx.api()?.get_file(&params.file_key, None).await?;

    let needle = params.search_text.to_lowercase();
    let matches: Vec<_> = nodes_by_type(&file, "TEXT")
        .into_iter()
        .filter(|node| {
            node.characters
                .as_deref()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        })
        .collect();

    if matches.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No text matching \"{}\" found in file {}",
            params.search_text, params.file_key
        )]));
    }

    let list = matches
        .iter()
        .map(|node| {
            format!(
                "- **{}** (ID: {})\n  Path: {}\n  Text: \"{}\"",
                node.name,
                node.id,
                node_path(&file, &node.id).join(" > "),
                node.characters.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ToolResponse::success([
        format!("# Text Search Results for \"{}\"", params.search_text),
        format!("Found {} matching text nodes:", matches.len()),
        list,
    ]))
}

fn file_key_schema() -> Value {
    json!({ "type": "string", "minLength": 1, "description": "The Figma file key" })
}

/// File tool definitions.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "get_file",
            "Get a Figma file summary or its full document",
            json!({
                "type": "object",
                "properties": {
                    "file_key": file_key_schema(),
                    "return_full_file": { "type": "boolean", "default": false, "description": "Whether to return the full file contents or just a summary" }
                },
                "required": ["file_key"]
            }),
        ),
        tool(
            "get_node",
            "Get a node of a Figma file",
            json!({
                "type": "object",
                "properties": {
                    "file_key": file_key_schema(),
                    "node_id": { "type": "string", "minLength": 1, "description": "The ID of the node to retrieve" }
                },
                "required": ["file_key", "node_id"]
            }),
        ),
        tool(
            "get_images",
            "Export nodes as images and return their URLs",
            json!({
                "type": "object",
                "properties": {
                    "file_key": file_key_schema(),
                    "node_ids": { "type": "array", "items": { "type": "string" }, "minItems": 1, "description": "The IDs of nodes to export as images" },
                    "format": { "type": "string", "enum": ["jpg", "png", "svg", "pdf"], "default": "png" },
                    "scale": { "type": "number", "minimum": 0.01, "maximum": 4, "default": 1 }
                },
                "required": ["file_key", "node_ids"]
            }),
        ),
        tool(
            "get_file_versions",
            "List the version history of a Figma file",
            json!({
                "type": "object",
                "properties": { "file_key": file_key_schema() },
                "required": ["file_key"]
            }),
        ),
        tool(
            "get_components",
            "List the published components of a Figma file",
            json!({
                "type": "object",
                "properties": { "file_key": file_key_schema() },
                "required": ["file_key"]
            }),
        ),
        tool(
            "search_text",
            "Find text nodes containing the given text (case-insensitive)",
            json!({
                "type": "object",
                "properties": {
                    "file_key": file_key_schema(),
                    "search_text": { "type": "string", "minLength": 1, "description": "The text to search for in the file" }
                },
                "required": ["file_key", "search_text"]
            }),
        ),
    ]
}
