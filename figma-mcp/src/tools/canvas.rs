//! Canvas tools: shapes, text and inspection through the plugin relay.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{id_line, is_hex_color, parse, plugin_failure, pretty, require, tool, ToolContext, ToolError};
use crate::server::Tool;
use crate::{ToolResponse, PLUGIN_HINT};

fn default_size() -> f64 {
    100.0
}

fn default_color() -> String {
    "#ff0000".to_string()
}

fn default_text() -> String {
    "Hello Figma!".to_string()
}

fn default_font_size() -> f64 {
    24.0
}

fn default_end_angle() -> f64 {
    180.0
}

fn default_polygon_points() -> u32 {
    3
}

fn default_star_points() -> u32 {
    5
}

fn default_star_inner_radius() -> f64 {
    0.5
}

/// Position, size and fill shared by the shape tools.
///
/// Styling properties not listed here (strokes, effects, corner radii,
/// layout constraints, ...) are forwarded to the plugin unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeParams {
    /// X position.
    #[serde(default)]
    pub x: f64,
    /// Y position.
    #[serde(default)]
    pub y: f64,
    /// Width in pixels.
    #[serde(default = "default_size")]
    pub width: f64,
    /// Height in pixels.
    #[serde(default = "default_size")]
    pub height: f64,
    /// Fill color, `#RRGGBB` or `#RRGGBBAA`.
    #[serde(default = "default_color")]
    pub color: String,
    /// Additional node properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShapeParams {
    fn validate(&self) -> Result<(), ToolError> {
        require(self.width >= 1.0, "width must be at least 1")?;
        require(self.height >= 1.0, "height must be at least 1")?;
        require(
            is_hex_color(&self.color),
            format!("color must be #RRGGBB or #RRGGBBAA, got {}", self.color),
        )
    }

    fn summary(&self) -> String {
        format!(
            "- Position: ({}, {})\n- Size: {}×{}px",
            self.x, self.y, self.width, self.height
        )
    }
}

/// `create_arc` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcParams {
    /// Bounds and fill.
    #[serde(flatten)]
    pub shape: ShapeParams,
    /// Start angle in degrees.
    #[serde(default)]
    pub start_angle: f64,
    /// End angle in degrees.
    #[serde(default = "default_end_angle")]
    pub end_angle: f64,
    /// Inner radius ratio (0 to 1); above 0 makes a donut.
    #[serde(default)]
    pub inner_radius: f64,
}

/// `create_polygon` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonParams {
    /// Bounds and fill.
    #[serde(flatten)]
    pub shape: ShapeParams,
    /// Number of sides.
    #[serde(default = "default_polygon_points")]
    pub point_count: u32,
}

/// `create_star` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarParams {
    /// Bounds and fill.
    #[serde(flatten)]
    pub shape: ShapeParams,
    /// Number of points.
    #[serde(default = "default_star_points")]
    pub point_count: u32,
    /// Inner radius ratio (0 to 1).
    #[serde(default = "default_star_inner_radius")]
    pub inner_radius: f64,
}

/// `create_line` parameters. `width` is the length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineParams {
    /// X position.
    #[serde(default)]
    pub x: f64,
    /// Y position.
    #[serde(default)]
    pub y: f64,
    /// Length in pixels.
    #[serde(default = "default_size")]
    pub width: f64,
    /// Stroke color.
    #[serde(default = "default_color")]
    pub color: String,
    /// Rotation in degrees (-180 to 180).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// Additional node properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `create_text` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextParams {
    /// X position.
    #[serde(default)]
    pub x: f64,
    /// Y position.
    #[serde(default)]
    pub y: f64,
    /// Text content.
    #[serde(default = "default_text")]
    pub text: String,
    /// Font size in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Additional text properties (font name, alignment, spacing).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `modify_rectangle` parameters. Only the given fields change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRectangleParams {
    /// Rectangle node id.
    pub id: String,
    /// New X position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New Y position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width (applied together with `height`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height (applied together with `width`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New corner radius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    /// New fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// `get_elements` parameters, forwarded as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementsParams {
    /// Page to list; the current page when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    /// Node type filter; all types when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Maximum number of elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Include hidden nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_hidden: Option<bool>,
}

/// `get_element` parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementParams {
    /// Node id.
    pub node_id: String,
    /// Also return direct children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_children: Option<bool>,
}

/// Dispatch canvas tools.
pub async fn call(ctx: &ToolContext, name: &str, args: &Value) -> Option<ToolResponse> {
    let response = match name {
        "create_rectangle" => create_rectangle(ctx, args).await,
        "create_circle" => create_circle(ctx, args).await,
        "create_arc" => create_arc(ctx, args).await,
        "create_polygon" => create_polygon(ctx, args).await,
        "create_star" => create_star(ctx, args).await,
        "create_vector" => create_vector(ctx, args).await,
        "create_line" => create_line(ctx, args).await,
        "create_text" => create_text(ctx, args).await,
        "modify_rectangle" => modify_rectangle(ctx, args).await,
        "get_selection" => get_selection(ctx).await,
        "check_connection" => check_connection(ctx),
        "get_elements" => get_elements(ctx, args).await,
        "get_element" => get_element(ctx, args).await,
        _ => return None,
    };
    Some(response)
}

fn created(shape: &str, details: String, result: Option<&Value>) -> ToolResponse {
    let intro = if shape == "Text" {
        "New text has been created in your Figma canvas.".to_string()
    } else {
        format!(
            "A new {} has been created in your Figma canvas.",
            shape.to_lowercase()
        )
    };
    ToolResponse::success([
        format!("# {shape} Created Successfully"),
        intro,
        details,
        id_line(result, "Node ID", "Creation successful"),
    ])
}

async fn create_shape(
    ctx: &ToolContext,
    args: &Value,
    command: &str,
    shape: &str,
) -> Result<ToolResponse, ToolError> {
    let params: ShapeParams = parse(args)?;
    params.validate()?;
    let result = ctx.plugin(command, &params).await?;
    Ok(created(
        shape,
        format!("{}\n- Color: {}", params.summary(), params.color),
        result.as_ref(),
    ))
}

async fn create_rectangle(ctx: &ToolContext, args: &Value) -> ToolResponse {
    create_shape(ctx, args, "create-rectangle", "Rectangle")
        .await
        .unwrap_or_else(|e| plugin_failure("creating rectangle", &e))
}

async fn create_circle(ctx: &ToolContext, args: &Value) -> ToolResponse {
    create_shape(ctx, args, "create-circle", "Circle")
        .await
        .unwrap_or_else(|e| plugin_failure("creating circle", &e))
}

async fn create_vector(ctx: &ToolContext, args: &Value) -> ToolResponse {
    create_shape(ctx, args, "create-vector", "Vector")
        .await
        .unwrap_or_else(|e| plugin_failure("creating vector", &e))
}

async fn create_arc(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: ArcParams = parse(args)?;
        params.shape.validate()?;
        require(
            (0.0..=1.0).contains(&params.inner_radius),
            "innerRadius must be between 0 and 1",
        )?;
        let result = ctx.plugin("create-arc", &params).await?;
        Ok::<_, ToolError>(created(
            "Arc",
            format!(
                "{}\n- Angles: {}° to {}°\n- Inner radius: {}\n- Color: {}",
                params.shape.summary(),
                params.start_angle,
                params.end_angle,
                params.inner_radius,
                params.shape.color
            ),
            result.as_ref(),
        ))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("creating arc", &e))
}

async fn create_polygon(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: PolygonParams = parse(args)?;
        params.shape.validate()?;
        require(params.point_count >= 3, "pointCount must be at least 3")?;
        let result = ctx.plugin("create-polygon", &params).await?;
        Ok::<_, ToolError>(created(
            "Polygon",
            format!(
                "{}\n- Sides: {}\n- Color: {}",
                params.shape.summary(),
                params.point_count,
                params.shape.color
            ),
            result.as_ref(),
        ))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("creating polygon", &e))
}

async fn create_star(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: StarParams = parse(args)?;
        params.shape.validate()?;
        require(params.point_count >= 3, "pointCount must be at least 3")?;
        require(
            (0.0..=1.0).contains(&params.inner_radius),
            "innerRadius must be between 0 and 1",
        )?;
        let result = ctx.plugin("create-star", &params).await?;
        Ok::<_, ToolError>(created(
            "Star",
            format!(
                "{}\n- Points: {}\n- Inner Radius: {}\n- Color: {}",
                params.shape.summary(),
                params.point_count,
                params.inner_radius,
                params.shape.color
            ),
            result.as_ref(),
        ))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("creating star", &e))
}

async fn create_line(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: LineParams = parse(args)?;
        require(params.width >= 1.0, "width must be at least 1")?;
        require(is_hex_color(&params.color), "color must be #RRGGBB or #RRGGBBAA")?;
        if let Some(rotation) = params.rotation {
            require(
                (-180.0..=180.0).contains(&rotation),
                "rotation must be between -180 and 180",
            )?;
        }
        let result = ctx.plugin("create-line", &params).await?;
        Ok::<_, ToolError>(ToolResponse::success([
            "# Line Created Successfully".to_string(),
            "A new line has been created in your Figma canvas.".to_string(),
            format!(
                "- Position: ({}, {})\n- Length: {}px\n- Color: {}",
                params.x, params.y, params.width, params.color
            ),
            format!("- Rotation: {}°", params.rotation.unwrap_or(0.0)),
            id_line(result.as_ref(), "Node ID", "Creation successful"),
        ]))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("creating line", &e))
}

async fn create_text(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: TextParams = parse(args)?;
        require(params.font_size >= 1.0, "fontSize must be at least 1")?;
        let result = ctx.plugin("create-text", &params).await?;
        Ok::<_, ToolError>(created(
            "Text",
            format!(
                "- Position: ({}, {})\n- Font Size: {}px\n- Content: \"{}\"",
                params.x, params.y, params.font_size, params.text
            ),
            result.as_ref(),
        ))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("creating text", &e))
}

async fn modify_rectangle(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: ModifyRectangleParams = parse(args)?;
        require(!params.id.is_empty(), "Rectangle ID is required")?;
        if let Some(color) = &params.color {
            require(is_hex_color(color), "color must be #RRGGBB or #RRGGBBAA")?;
        }
        let result = ctx.plugin("modify-rectangle", &params).await?;

        let mut changes = Vec::new();
        if let (Some(x), Some(y)) = (params.x, params.y) {
            changes.push(format!("- Position: ({x}, {y})"));
        } else if let Some(x) = params.x {
            changes.push(format!("- X: {x}"));
        } else if let Some(y) = params.y {
            changes.push(format!("- Y: {y}"));
        }
        if let (Some(w), Some(h)) = (params.width, params.height) {
            changes.push(format!("- Size: {w}×{h}px"));
        }
        if let Some(radius) = params.corner_radius {
            changes.push(format!("- Corner radius: {radius}"));
        }
        if let Some(color) = &params.color {
            changes.push(format!("- Color: {color}"));
        }
        let changes = if changes.is_empty() {
            "No properties changed.".to_string()
        } else {
            changes.join("\n")
        };

        Ok::<_, ToolError>(ToolResponse::success([
            "# Rectangle Modified Successfully".to_string(),
            format!("Rectangle {} has been updated.", params.id),
            changes,
            id_line(result.as_ref(), "Node ID", "Modification successful"),
        ]))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("modifying rectangle", &e))
}

async fn get_selection(ctx: &ToolContext) -> ToolResponse {
    match ctx.plugin("get-selection", &json!({})).await {
        Ok(result) => ToolResponse::success([
            "# Current Selection".to_string(),
            "Information about currently selected elements in Figma:".to_string(),
            result.as_ref().map_or_else(
                || "No selection information available".to_string(),
                pretty,
            ),
        ]),
        Err(e) => plugin_failure("getting selection", &e),
    }
}

fn check_connection(ctx: &ToolContext) -> ToolResponse {
    if ctx.relay.is_connected() {
        ToolResponse::success([
            "# Figma Plugin Connection Status",
            "✅ Figma plugin is connected to MCP server",
            "You can now use MCP tools to interact with the Figma canvas.",
        ])
    } else {
        ToolResponse::success([
            "# Figma Plugin Connection Status",
            "❌ No Figma plugin is currently connected",
            "Please make sure the Figma plugin is running and connected to the MCP server.",
        ])
    }
}

async fn get_elements(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: ElementsParams = parse(args)?;
        let result = ctx.plugin("get-elements", &params).await?;
        let count = result.as_ref().and_then(Value::as_array).map_or(0, Vec::len);
        let type_value = params.node_type.as_deref().unwrap_or("ALL");
        let page_name = if params.page_id.is_some() {
            "specified page"
        } else {
            "current page"
        };
        let plural = if count == 1 { "" } else { "s" };

        Ok::<_, ToolError>(ToolResponse::success([
            "# Elements Retrieved".to_string(),
            format!("Found {count} element{plural} of type {type_value} on {page_name}."),
            if count > 0 {
                format!("Element information: {}", pretty(&result))
            } else {
                "No elements matched your criteria.".to_string()
            },
        ]))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("retrieving elements", &e))
}

async fn get_element(ctx: &ToolContext, args: &Value) -> ToolResponse {
    let run = async {
        let params: ElementParams = parse(args)?;
        let result = ctx.plugin("get-element", &params).await?;
        let with_children = result
            .as_ref()
            .and_then(Value::as_array)
            .filter(|items| items.len() > 1)
            .map(Vec::len);

        Ok::<_, ToolError>(ToolResponse::success([
            "# Element Retrieved".to_string(),
            format!("Successfully retrieved element with ID: {}", params.node_id),
            with_children.map_or_else(
                || "Element information:".to_string(),
                |len| format!("Element and {} children retrieved.", len - 1),
            ),
            pretty(&result),
        ]))
    };
    run.await
        .unwrap_or_else(|e| plugin_failure("retrieving element", &e))
}

fn position_schema() -> Map<String, Value> {
    let schema = json!({
        "x": { "type": "number", "default": 0, "description": "X position of the element" },
        "y": { "type": "number", "default": 0, "description": "Y position of the element" },
        "name": { "type": "string", "description": "Name of the node" },
        "visible": { "type": "boolean" },
        "locked": { "type": "boolean" },
        "opacity": { "type": "number", "minimum": 0, "maximum": 1 }
    });
    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn shape_schema(extra: &Value) -> Value {
    let mut props = position_schema();
    props.insert(
        "width".into(),
        json!({ "type": "number", "minimum": 1, "default": 100, "description": "Width in pixels" }),
    );
    props.insert(
        "height".into(),
        json!({ "type": "number", "minimum": 1, "default": 100, "description": "Height in pixels" }),
    );
    props.insert(
        "color".into(),
        json!({
            "type": "string",
            "pattern": "^#([0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$",
            "default": "#ff0000",
            "description": "Fill color as hex code (#RRGGBB or #RRGGBBAA)"
        }),
    );
    props.insert("strokes".into(), json!({ "type": "array" }));
    props.insert("strokeWeight".into(), json!({ "type": "number", "minimum": 0 }));
    props.insert("effects".into(), json!({ "type": "array" }));
    props.insert(
        "rotation".into(),
        json!({ "type": "number", "minimum": -180, "maximum": 180 }),
    );
    if let Value::Object(extra) = extra {
        props.extend(extra.clone());
    }
    json!({ "type": "object", "properties": props, "additionalProperties": true })
}

/// Canvas tool definitions.
#[must_use]
pub fn definitions() -> Vec<Tool> {
    vec![
        tool(
            "create_rectangle",
            "Create a rectangle on the Figma canvas",
            shape_schema(&json!({
                "cornerRadius": { "type": "number", "minimum": 0, "description": "Rounds all corners by this amount" }
            })),
        ),
        tool(
            "create_circle",
            "Create a circle or ellipse on the Figma canvas",
            shape_schema(&json!({
                "arcData": {
                    "type": "object",
                    "properties": {
                        "startingAngle": { "type": "number" },
                        "endingAngle": { "type": "number" },
                        "innerRadius": { "type": "number", "minimum": 0, "maximum": 1 }
                    }
                }
            })),
        ),
        tool(
            "create_arc",
            "Create an arc (partial ellipse or donut) on the Figma canvas",
            shape_schema(&json!({
                "startAngle": { "type": "number", "default": 0, "description": "Starting angle in degrees" },
                "endAngle": { "type": "number", "default": 180, "description": "Ending angle in degrees" },
                "innerRadius": { "type": "number", "minimum": 0, "maximum": 1, "default": 0, "description": "Inner radius ratio (0-1) for donut shapes" }
            })),
        ),
        tool(
            "create_polygon",
            "Create a regular polygon on the Figma canvas",
            shape_schema(&json!({
                "pointCount": { "type": "integer", "minimum": 3, "default": 3, "description": "Number of sides" }
            })),
        ),
        tool(
            "create_star",
            "Create a star on the Figma canvas",
            shape_schema(&json!({
                "pointCount": { "type": "integer", "minimum": 3, "default": 5, "description": "Number of points" },
                "innerRadius": { "type": "number", "minimum": 0, "maximum": 1, "default": 0.5, "description": "Inner radius ratio (0-1)" }
            })),
        ),
        tool(
            "create_vector",
            "Create a vector shape on the Figma canvas",
            shape_schema(&json!({
                "vectorNetwork": { "type": "object", "description": "Vertices, segments and regions" },
                "vectorPaths": { "type": "array", "description": "SVG path data" },
                "handleMirroring": { "type": "string", "enum": ["NONE", "ANGLE", "ANGLE_AND_LENGTH"] }
            })),
        ),
        tool("create_line", "Create a line on the Figma canvas", {
            let mut props = position_schema();
            props.insert(
                "width".into(),
                json!({ "type": "number", "minimum": 1, "default": 100, "description": "Length of the line in pixels" }),
            );
            props.insert(
                "color".into(),
                json!({ "type": "string", "default": "#ff0000", "description": "Stroke color as hex code" }),
            );
            props.insert(
                "rotation".into(),
                json!({ "type": "number", "minimum": -180, "maximum": 180 }),
            );
            props.insert("strokeWeight".into(), json!({ "type": "number", "minimum": 0 }));
            json!({ "type": "object", "properties": props, "additionalProperties": true })
        }),
        tool("create_text", "Create a text node on the Figma canvas", {
            let mut props = position_schema();
            props.insert(
                "text".into(),
                json!({ "type": "string", "default": "Hello Figma!", "description": "The text content" }),
            );
            props.insert(
                "fontSize".into(),
                json!({ "type": "number", "minimum": 1, "default": 24, "description": "The font size in pixels" }),
            );
            props.insert(
                "fontName".into(),
                json!({
                    "type": "object",
                    "properties": { "family": { "type": "string" }, "style": { "type": "string" } }
                }),
            );
            props.insert(
                "textAlignHorizontal".into(),
                json!({ "type": "string", "enum": ["LEFT", "CENTER", "RIGHT", "JUSTIFIED"] }),
            );
            json!({ "type": "object", "properties": props, "additionalProperties": true })
        }),
        tool(
            "modify_rectangle",
            "Change position, size, corner radius or color of an existing rectangle",
            json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Rectangle node ID" },
                    "x": { "type": "number" },
                    "y": { "type": "number" },
                    "width": { "type": "number", "minimum": 1 },
                    "height": { "type": "number", "minimum": 1 },
                    "cornerRadius": { "type": "number", "minimum": 0 },
                    "color": { "type": "string", "pattern": "^#([0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$" }
                },
                "required": ["id"]
            }),
        ),
        tool(
            "get_selection",
            "Get information about the currently selected elements in Figma",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "check_connection",
            "Check whether a Figma plugin is connected to the MCP server",
            json!({ "type": "object", "properties": {} }),
        ),
        tool(
            "get_elements",
            "List elements on the current page or a given page",
            json!({
                "type": "object",
                "properties": {
                    "page_id": { "type": "string", "description": "Page ID (current page when omitted)" },
                    "type": { "type": "string", "description": "Node type filter, e.g. RECTANGLE (all types when omitted)" },
                    "limit": { "type": "integer", "minimum": 1, "description": "Maximum number of elements (default 100)" },
                    "include_hidden": { "type": "boolean", "description": "Include hidden elements" }
                }
            }),
        ),
        tool(
            "get_element",
            "Get a single element by node ID",
            json!({
                "type": "object",
                "properties": {
                    "node_id": { "type": "string", "description": "The node ID" },
                    "include_children": { "type": "boolean", "description": "Include direct children" }
                },
                "required": ["node_id"]
            }),
        ),
    ]
}

/// Remediation text shown by tools that refuse to run without a plugin.
pub(crate) fn not_connected() -> ToolResponse {
    ToolResponse::error([format!("No Figma plugin is connected. {PLUGIN_HINT}")])
}
