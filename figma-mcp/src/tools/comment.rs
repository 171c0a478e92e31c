//! Comment tools.

use figma_api::PostComment;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{api_failure, parse, require, tool, ToolContext, ToolError};
use crate::server::Tool;
use crate::ToolResponse;

#[derive(Debug, Deserialize)]
struct GetCommentsParams {
    file_key: String,
}

#[derive(Debug, Deserialize)]
struct AddCommentParams {
    file_key: String,
    message: String,
    #[serde(default)]
    node_id: Option<String>,
}

/// Dispatch comment tools.
pub async fn call(ctx: &ToolContext, name: &str, args: &Value) -> Option<ToolResponse> {
    let response = match name {
        "get_comments" => get_comments(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting comments", &e)),
        "add_comment" => add_comment(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("adding comment", &e)),
        _ => return None,
    };
    Some(response)
}

async fn get_comments(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: GetCommentsParams = parse(args)?;
    require(!params.file_key.is_empty(), "file_key must not be empty")?;
    let comments = ctx.api()?.get_comments(&params.file_key, true).await?;

    if comments.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No comments found in file {}",
            params.file_key
        )]));
    }

    let list = comments
        .iter()
        .map(|c| format!("- **{}** ({}): {}", c.user.handle, c.created_at, c.message))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(ToolResponse::success([
        format!("# Comments for file {}", params.file_key),
        format!("Found {} comments:", comments.len()),
        list,
    ]))
}

async fn add_comment(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: AddCommentParams = parse(args)?;
    require(!params.file_key.is_empty(), "file_key must not be empty")?;
    require(!params.message.is_empty(), "message must not be empty")?;

    let mut body = PostComment::new(params.message);
    if let Some(node_id) = params.node_id.filter(|id| !id.is_empty()) {
        body = body.on_node(node_id);
    }
    let comment = ctx.api()?.post_comment(&params.file_key, &body).await?;

    Ok(ToolResponse::success([
        "Comment added successfully!".to_string(),
        format!("Comment ID: {}", comment.id),
        format!("By user: {}", comment.user.handle),
        format!("Added at: {}", comment.created_at),
    ]))
}

/// Comment tool definitions.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "get_comments",
            "List the comments of a Figma file",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "minLength": 1, "description": "The Figma file key to retrieve comments from" }
                },
                "required": ["file_key"]
            }),
        ),
        tool(
            "add_comment",
            "Add a comment to a Figma file, optionally pinned to a node",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "minLength": 1, "description": "The Figma file key" },
                    "message": { "type": "string", "minLength": 1, "description": "The comment text" },
                    "node_id": { "type": "string", "description": "Optional node ID to attach the comment to" }
                },
                "required": ["file_key", "message"]
            }),
        ),
    ]
}
