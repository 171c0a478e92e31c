//! Frame tools: REST frame listing and the widget `Frame` component reference.

use figma_api::node::nodes_by_type;
use figma_api::Node;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{api_failure, parse, require, tool, ToolContext, ToolError};
use crate::server::Tool;
use crate::ToolResponse;

#[derive(Debug, Deserialize)]
struct FileKeyParams {
    file_key: String,
}

const FRAME_DOCUMENTATION: &[&str] = &[
    "# Frame Component Documentation",
    "Frame acts exactly like a non-autolayout Frame within Figma, where children are positioned using x and y constraints. This component is useful to define a layout hierarchy.",
    "If you want to use autolayout, use AutoLayout instead.",
    "## BaseProps",
    "- **name**: string - The name of the component",
    "- **hidden**: boolean - Toggles whether to show the component",
    "- **onClick**: (event: WidgetClickEvent) => Promise<any> | void - Attach a click handler",
    "- **key**: string | number - The key of the component",
    "- **hoverStyle**: HoverStyle - The style to be applied when hovering",
    "- **tooltip**: string - The tooltip shown when hovering",
    "- **positioning**: 'auto' | 'absolute' - How to position the node inside an AutoLayout parent",
    "## BlendProps",
    "- **blendMode**: BlendMode - The blendMode of the component",
    "- **opacity**: number - The opacity of the component",
    "- **effect**: Effect | Effect[] - The effect of the component",
    "## ConstraintProps",
    "- **x**: number | HorizontalConstraint - The x position of the node",
    "- **y**: number | VerticalConstraint - The y position of the node",
    "- **overflow**: 'visible' | 'hidden' | 'scroll' - The overflow behavior",
    "## SizeProps (Required)",
    "- **width**: Size - The width of the component (required)",
    "- **height**: Size - The height of the component (required)",
    "- **minWidth**: number - The minimum width",
    "- **maxWidth**: number - The maximum width",
    "- **minHeight**: number - The minimum height",
    "- **maxHeight**: number - The maximum height",
    "- **rotation**: number - The rotation in degrees (-180 to 180)",
    "## CornerProps",
    "- **cornerRadius**: CornerRadius - The corner radius in pixels",
    "## GeometryProps",
    "- **fill**: HexCode | Color | Paint | (SolidPaint | GradientPaint)[] - The fill paints",
    "- **stroke**: HexCode | Color | SolidPaint | GradientPaint | (SolidPaint | GradientPaint)[] - The stroke paints",
    "- **strokeWidth**: number - The stroke thickness in pixels",
    "- **strokeAlign**: StrokeAlign - The stroke alignment",
    "- **strokeDashPattern**: number[] - The stroke dash pattern",
];

/// Dispatch frame tools.
pub async fn call(ctx: &ToolContext, name: &str, args: &Value) -> Option<ToolResponse> {
    let response = match name {
        "get_frame_documentation" => ToolResponse::success(FRAME_DOCUMENTATION.iter().copied()),
        "get_frames" => get_frames(ctx, args)
            .await
            .unwrap_or_else(|e| api_failure("getting frames", &e)),
        _ => return None,
    };
    Some(response)
}

/// `width`/`height` as the node carries them, else from its bounding box.
fn dimension(node: &Node, key: &str) -> String {
    node.extra
        .get(key)
        .or_else(|| node.extra.get("absoluteBoundingBox").and_then(|b| b.get(key)))
        .filter(|v| v.is_number())
        .map_or_else(|| "Unknown".to_string(), ToString::to_string)
}

async fn get_frames(ctx: &ToolContext, args: &Value) -> Result<ToolResponse, ToolError> {
    let params: FileKeyParams = parse(args)?;
    require(!params.file_key.is_empty(), "file_key must not be empty")?;
    let file = ctx.api()?.get_file(&params.file_key, None).await?;
    let frames = nodes_by_type(&file, "FRAME");

    if frames.is_empty() {
        return Ok(ToolResponse::success([format!(
            "No frames found in file {}",
            params.file_key
        )]));
    }

    let list = frames
        .iter()
        .enumerate()
        .map(|(i, node)| {
            format!(
                "{}. **{}** (ID: {})\n   - Width: {}, Height: {}\n   - Children: {}",
                i + 1,
                node.name,
                node.id,
                dimension(node, "width"),
                dimension(node, "height"),
                node.children.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(ToolResponse::success([
        format!("# Frames in file {}", params.file_key),
        format!("Found {} frames:", frames.len()),
        list,
    ]))
}

/// Frame tool definitions.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "get_frame_documentation",
            "Reference for the widget Frame component and its props",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "get_frames",
            "List every frame in a Figma file with its size and child count",
            json!({
                "type": "object",
                "properties": {
                    "file_key": { "type": "string", "minLength": 1, "description": "The Figma file key to retrieve frames from" }
                },
                "required": ["file_key"]
            }),
        ),
    ]
}
