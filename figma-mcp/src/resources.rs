//! MCP resources for Figma files and nodes.

use serde::{Deserialize, Serialize};

use crate::tools::{ToolContext, ToolError};

const MARKDOWN: &str = "text/markdown";

/// One entry of a `resources/read` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceContents {
    /// Resource URI.
    pub uri: String,
    /// MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Text body.
    pub text: String,
}

impl ResourceContents {
    fn markdown(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: MARKDOWN.to_string(),
            text: text.into(),
        }
    }
}

/// Resource URI schemes.
pub mod uri {
    /// Parse a Figma resource URI.
    ///
    /// Supported formats:
    /// - `figma-file://` - Index of file resources
    /// - `figma-file://{file_key}` - A file
    /// - `figma-node://{file_key}` - Top-level nodes of a file
    /// - `figma-node://{file_key}/{node_id}` - A node
    #[must_use]
    pub fn parse(uri: &str) -> Option<FigmaUri> {
        if let Some(rest) = uri.strip_prefix("figma-file://") {
            return match rest.trim_end_matches('/') {
                "" => Some(FigmaUri::FileIndex),
                key if !key.contains('/') => Some(FigmaUri::File(key.to_string())),
                _ => None,
            };
        }

        let rest = uri.strip_prefix("figma-node://")?;
        let parts: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        match parts.as_slice() {
            [key] if !key.is_empty() => Some(FigmaUri::NodeList((*key).to_string())),
            [key, node_id] if !key.is_empty() && !node_id.is_empty() => Some(FigmaUri::Node {
                file_key: (*key).to_string(),
                node_id: (*node_id).to_string(),
            }),
            _ => None,
        }
    }

    /// Parsed Figma URI.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum FigmaUri {
        /// Index of file resources.
        FileIndex,
        /// A file.
        File(String),
        /// Top-level nodes of a file.
        NodeList(String),
        /// A single node.
        Node {
            /// File key.
            file_key: String,
            /// Node id.
            node_id: String,
        },
    }
}

use uri::FigmaUri;

/// Static resources for `resources/list`.
#[must_use]
pub fn list() -> Vec<crate::server::Resource> {
    vec![crate::server::Resource {
        uri: "figma-file://".to_string(),
        name: "Figma Files".to_string(),
        description: "Index of Figma file resources".to_string(),
        mime_type: MARKDOWN.to_string(),
    }]
}

/// URI templates for `resources/templates/list`.
#[must_use]
pub fn templates() -> Vec<ResourceTemplate> {
    vec![
        ResourceTemplate {
            uri_template: "figma-file://{file_key}".to_string(),
            name: "figma-file".to_string(),
            description: "Summary of a Figma file".to_string(),
            mime_type: MARKDOWN.to_string(),
        },
        ResourceTemplate {
            uri_template: "figma-node://{file_key}/{node_id}".to_string(),
            name: "figma-node".to_string(),
            description: "Summary of a node in a Figma file".to_string(),
            mime_type: MARKDOWN.to_string(),
        },
    ]
}

/// MCP resource template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceTemplate {
    /// RFC 6570 URI template.
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,
    /// Template name.
    pub name: String,
    /// Description.
    pub description: String,
    /// MIME type.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Read a resource. `None` when the URI is not a Figma resource.
///
/// API failures are reported inside the contents, like tool failures.
pub async fn read(ctx: &ToolContext, uri: &str) -> Option<Vec<ResourceContents>> {
    let parsed = uri::parse(uri)?;
    let contents = match fetch(ctx, uri, &parsed).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!(uri, "Error reading resource: {}", e);
            vec![ResourceContents::markdown(uri, format!("Error: {e}"))]
        }
    };
    Some(contents)
}

async fn fetch(
    ctx: &ToolContext,
    uri: &str,
    parsed: &FigmaUri,
) -> Result<Vec<ResourceContents>, ToolError> {
    match parsed {
        FigmaUri::FileIndex => Ok(vec![ResourceContents::markdown(
            uri,
            "# Figma Files\n\nTo access a specific file, you need to provide its file key.",
        )]),
        FigmaUri::File(file_key) => {
            let file = ctx.api()?.get_file(file_key, None).await?;
            Ok(vec![ResourceContents::markdown(
                uri,
                format!(
                    "# {}\n\nLast modified: {}\n\nDocument contains {} top-level nodes.\nComponents: {}\nStyles: {}",
                    file.name,
                    file.last_modified,
                    file.document.children.len(),
                    file.components.len(),
                    file.styles.len()
                ),
            )])
        }
        FigmaUri::NodeList(file_key) => {
            let file = ctx.api()?.get_file(file_key, Some(1)).await?;
            Ok(file
                .document
                .children
                .iter()
                .map(|node| {
                    ResourceContents::markdown(
                        format!("figma-node://{file_key}/{}", node.id),
                        format!("# {}\n\nType: {}\nID: {}", node.name, node.node_type, node.id),
                    )
                })
                .collect())
        }
        FigmaUri::Node { file_key, node_id } => {
            let nodes = ctx.api()?.get_file_nodes(file_key, &[node_id.as_str()]).await?;
            let text = match nodes.nodes.get(node_id).and_then(Option::as_ref) {
                Some(entry) => {
                    let node = &entry.document;
                    format!(
                        "# {}\n\nType: {}\nID: {}\nChildren: {}",
                        node.name,
                        node.node_type,
                        node.id,
                        node.children.len()
                    )
                }
                None => format!("Node {node_id} not found in file {file_key}"),
            };
            Ok(vec![ResourceContents::markdown(uri, text)])
        }
    }
}
