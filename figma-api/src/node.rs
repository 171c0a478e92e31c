//! Document tree helpers.
//!
//! All searches are depth-first in child order, matching the layer order
//! shown in the Figma UI.

use serde_json::{json, Map, Value};

use crate::types::{FileResponse, Node};

/// Find a node anywhere in the file, including the document root.
#[must_use]
pub fn find_node_by_id<'a>(file: &'a FileResponse, node_id: &str) -> Option<&'a Node> {
    find_in(&file.document, node_id)
}

fn find_in<'a>(node: &'a Node, node_id: &str) -> Option<&'a Node> {
    if node.id == node_id {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_in(child, node_id))
}

/// Every node of the given type, in document order.
#[must_use]
pub fn nodes_by_type<'a>(file: &'a FileResponse, node_type: &str) -> Vec<&'a Node> {
    let mut found = Vec::new();
    collect_by_type(&file.document, node_type, &mut found);
    found
}

fn collect_by_type<'a>(node: &'a Node, node_type: &str, out: &mut Vec<&'a Node>) {
    if node.node_type == node_type {
        out.push(node);
    }
    for child in &node.children {
        collect_by_type(child, node_type, out);
    }
}

/// Layer names from the document root down to `node_id` (inclusive).
///
/// Empty when the node does not exist.
#[must_use]
pub fn node_path(file: &FileResponse, node_id: &str) -> Vec<String> {
    let mut path = Vec::new();
    if path_to(&file.document, node_id, &mut path) {
        path.reverse();
    }
    path
}

fn path_to(node: &Node, node_id: &str, path: &mut Vec<String>) -> bool {
    if node.id == node_id || node.children.iter().any(|c| path_to(c, node_id, path)) {
        path.push(node.name.clone());
        return true;
    }
    false
}

/// Text content of a `TEXT` node, empty for any other node.
#[must_use]
pub fn text_of(node: &Node) -> &str {
    if node.node_type == "TEXT" {
        node.characters.as_deref().unwrap_or_default()
    } else {
        ""
    }
}

/// Compact property summary: id, name and type plus a few type-specific
/// fields (text, fill kinds, child count).
#[must_use]
pub fn node_properties(node: &Node) -> Value {
    let mut props = Map::new();
    props.insert("id".into(), json!(node.id));
    props.insert("name".into(), json!(node.name));
    props.insert("type".into(), json!(node.node_type));

    match node.node_type.as_str() {
        "TEXT" => {
            props.insert("text".into(), json!(node.characters));
        }
        "RECTANGLE" | "ELLIPSE" | "POLYGON" | "STAR" | "VECTOR" => {
            if let Some(fills) = node.extra.get("fills").and_then(Value::as_array) {
                let fills: Vec<Value> = fills
                    .iter()
                    .map(|fill| json!({"type": fill.get("type"), "visible": fill.get("visible")}))
                    .collect();
                props.insert("fills".into(), Value::Array(fills));
            }
        }
        "FRAME" | "GROUP" | "INSTANCE" | "COMPONENT" => {
            props.insert("childCount".into(), json!(node.children.len()));
        }
        _ => {}
    }

    Value::Object(props)
}
