//! Response and request payloads of the Figma REST API.
//!
//! Only the fields the tools read are typed. Everything else lands in the
//! flattened `extra` map so a payload can be re-serialized without loss.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A node of the document tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id, e.g. `1:2`.
    pub id: String,
    /// Layer name.
    #[serde(default)]
    pub name: String,
    /// Node type, e.g. `FRAME`, `TEXT`.
    #[serde(rename = "type", default)]
    pub node_type: String,
    /// Text content of `TEXT` nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    /// Child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// All other node properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /files/:key`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// File name.
    pub name: String,
    /// ISO-8601 modification time.
    #[serde(default)]
    pub last_modified: String,
    /// Root `DOCUMENT` node.
    pub document: Node,
    /// Components keyed by node id.
    #[serde(default)]
    pub components: Map<String, Value>,
    /// Component sets keyed by node id.
    #[serde(default)]
    pub component_sets: Map<String, Value>,
    /// Styles keyed by node id.
    #[serde(default)]
    pub styles: Map<String, Value>,
    /// Remaining top-level fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `GET /files/:key/nodes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeEntry {
    /// The requested node with its subtree.
    pub document: Node,
    /// Remaining fields (components, styles, schema version).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /files/:key/nodes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNodesResponse {
    /// File name.
    #[serde(default)]
    pub name: String,
    /// File modification time.
    #[serde(default)]
    pub last_modified: String,
    /// Requested nodes; `None` for ids that do not exist.
    #[serde(default)]
    pub nodes: HashMap<String, Option<NodeEntry>>,
}

/// `GET /images/:key`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesResponse {
    /// Render error, if the whole request failed.
    #[serde(default)]
    pub err: Option<String>,
    /// Image URL per node id; `None` where rendering failed.
    #[serde(default)]
    pub images: BTreeMap<String, Option<String>>,
}

/// `GET /files/:key/images`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageFillsResponse {
    /// Whether the request failed.
    #[serde(default)]
    pub error: bool,
    /// HTTP status echoed by the API.
    #[serde(default)]
    pub status: Option<u16>,
    /// `{ images: { imageRef: url } }`
    #[serde(default)]
    pub meta: ImageFillsMeta,
}

/// Image fill URLs keyed by image reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageFillsMeta {
    /// Download URL per image reference.
    #[serde(default)]
    pub images: BTreeMap<String, String>,
}

/// A Figma user as embedded in comments and versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    #[serde(default)]
    pub id: String,
    /// Display handle.
    #[serde(default)]
    pub handle: String,
    /// Avatar URL.
    #[serde(default)]
    pub img_url: String,
}

/// A file comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: String,
    /// Comment body (markdown when requested with `as_md`).
    #[serde(default)]
    pub message: String,
    /// ISO-8601 creation time.
    #[serde(default)]
    pub created_at: String,
    /// Author.
    #[serde(default)]
    pub user: User,
    /// Where the comment is pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_meta: Option<Value>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `GET /files/:key/comments`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentsResponse {
    /// Comments, oldest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Body of `POST /files/:key/comments`.
#[derive(Debug, Clone, Serialize)]
pub struct PostComment {
    /// Comment text.
    pub message: String,
    /// Optional anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_meta: Option<ClientMeta>,
}

impl PostComment {
    /// A comment with no anchor.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            client_meta: None,
        }
    }

    /// Pin the comment to the top-left corner of a node.
    #[must_use]
    pub fn on_node(mut self, node_id: impl Into<String>) -> Self {
        self.client_meta = Some(ClientMeta {
            node_id: node_id.into(),
            node_offset: NodeOffset { x: 0.0, y: 0.0 },
        });
        self
    }
}

/// Comment anchor relative to a node.
#[derive(Debug, Clone, Serialize)]
pub struct ClientMeta {
    /// Anchor node.
    pub node_id: String,
    /// Offset inside the node.
    pub node_offset: NodeOffset,
}

/// Offset inside a node.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NodeOffset {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

/// A saved file version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Version {
    /// Version id.
    pub id: String,
    /// ISO-8601 creation time.
    #[serde(default)]
    pub created_at: String,
    /// Version label (may be absent for autosaves).
    #[serde(default)]
    pub label: Option<String>,
    /// Version description.
    #[serde(default)]
    pub description: Option<String>,
    /// Author.
    #[serde(default)]
    pub user: User,
}

/// `GET /files/:key/versions`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionsResponse {
    /// Versions, newest first.
    #[serde(default)]
    pub versions: Vec<Version>,
    /// Pagination cursors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// A project inside a team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// Project id (the API returns numbers for older teams).
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Project name.
    #[serde(default)]
    pub name: String,
}

/// `GET /teams/:id/projects`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamProjectsResponse {
    /// Team name.
    #[serde(default)]
    pub name: String,
    /// Projects visible to the token.
    #[serde(default)]
    pub projects: Vec<Project>,
}

/// A file inside a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFile {
    /// File key.
    pub key: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// ISO-8601 modification time.
    #[serde(default)]
    pub last_modified: String,
}

/// `GET /projects/:id/files`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFilesResponse {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Files in the project.
    #[serde(default)]
    pub files: Vec<ProjectFile>,
}

/// Published component metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentMeta {
    /// Global component key.
    pub key: String,
    /// Component name.
    #[serde(default)]
    pub name: String,
    /// Component description.
    #[serde(default)]
    pub description: String,
    /// Whether the component comes from a library.
    #[serde(default)]
    pub remote: bool,
    /// Remaining fields (file key, node id, thumbnail, timestamps).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Published component set metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSetMeta {
    /// Global component set key.
    pub key: String,
    /// Component set name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Published style metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleMeta {
    /// Global style key.
    pub key: String,
    /// Style name.
    #[serde(default)]
    pub name: String,
    /// `FILL`, `TEXT`, `EFFECT` or `GRID`.
    #[serde(default)]
    pub style_type: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `{status, error, meta}` envelope used by the library endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaResponse<T> {
    /// HTTP status echoed by the API.
    #[serde(default)]
    pub status: Option<u16>,
    /// Whether the request failed.
    #[serde(default)]
    pub error: bool,
    /// Payload.
    pub meta: T,
}

/// `meta` of the component listing endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentList {
    /// Components.
    #[serde(default)]
    pub components: Vec<ComponentMeta>,
    /// Pagination cursor (team endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
}

/// `meta` of the component set listing endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentSetList {
    /// Component sets.
    #[serde(default)]
    pub component_sets: Vec<ComponentSetMeta>,
    /// Pagination cursor (team endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
}

/// `meta` of the style listing endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleList {
    /// Styles.
    #[serde(default)]
    pub styles: Vec<StyleMeta>,
    /// Pagination cursor (team endpoints only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Value>,
}

/// Page size and cursors for the team library endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pagination {
    /// Items per page.
    pub page_size: Option<u32>,
    /// Return items after this cursor.
    pub after: Option<u64>,
    /// Return items before this cursor.
    pub before: Option<u64>,
}
