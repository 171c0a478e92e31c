//! HTTP client for the Figma REST API.

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::types::{
    Comment, CommentsResponse, ComponentList, ComponentMeta, ComponentSetList, ComponentSetMeta,
    FileNodesResponse, FileResponse, ImageFillsResponse, ImagesResponse, MetaResponse, Pagination,
    PostComment, ProjectFilesResponse, StyleList, StyleMeta, TeamProjectsResponse,
    VersionsResponse,
};

/// Public Figma REST endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.figma.com/v1";

const TOKEN_HEADER: &str = "X-Figma-Token";

/// Errors returned by [`FigmaClient`].
#[derive(Debug, Error)]
pub enum FigmaApiError {
    /// The configured base URL is invalid.
    #[error("invalid Figma API URL: {0}")]
    InvalidUrl(String),
    /// Connection, TLS or body read failure.
    #[error("Figma API request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("Figma API error {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// `err`/`message` from the body, or the raw body.
        message: String,
    },
    /// The body did not match the expected shape.
    #[error("failed to parse Figma API payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl FigmaApiError {
    /// Whether the token was rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Export format for [`FigmaClient::get_images`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG
    Jpg,
    /// PNG
    #[default]
    Png,
    /// SVG
    Svg,
    /// PDF
    Pdf,
}

impl ImageFormat {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional parameters of [`FigmaClient::get_images`].
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    /// Output format.
    pub format: Option<ImageFormat>,
    /// Scale between 0.01 and 4.
    pub scale: Option<f64>,
    /// Include `id` attributes in SVG output.
    pub svg_include_id: Option<bool>,
    /// Use the full node bounds instead of the cropped render bounds.
    pub use_absolute_bounds: Option<bool>,
    /// Render a specific file version.
    pub version: Option<String>,
}

impl ImageOptions {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(format) = self.format {
            query.push(("format", format.to_string()));
        }
        if let Some(scale) = self.scale {
            query.push(("scale", scale.to_string()));
        }
        if let Some(flag) = self.svg_include_id {
            query.push(("svg_include_id", flag.to_string()));
        }
        if let Some(flag) = self.use_absolute_bounds {
            query.push(("use_absolute_bounds", flag.to_string()));
        }
        if let Some(version) = &self.version {
            query.push(("version", version.clone()));
        }
        query
    }
}

impl Pagination {
    fn query(self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(size) = self.page_size {
            query.push(("page_size", size.to_string()));
        }
        if let Some(after) = self.after {
            query.push(("after", after.to_string()));
        }
        if let Some(before) = self.before {
            query.push(("before", before.to_string()));
        }
        query
    }
}

/// Asynchronous Figma REST client.
#[derive(Clone)]
pub struct FigmaClient {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl fmt::Debug for FigmaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FigmaClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl FigmaClient {
    /// Create a client for the public API.
    ///
    /// # Errors
    ///
    /// Returns [`FigmaApiError::Http`] if the HTTP client fails to build.
    pub fn new(token: impl Into<String>) -> Result<Self, FigmaApiError> {
        Self::with_base_url(token, DEFAULT_API_BASE_URL)
    }

    /// Create a client against a custom base URL (proxies, tests).
    ///
    /// # Errors
    ///
    /// Returns [`FigmaApiError::InvalidUrl`] if the URL is malformed.
    /// Returns [`FigmaApiError::Http`] if the HTTP client fails to build.
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl AsRef<str>,
    ) -> Result<Self, FigmaApiError> {
        let base_url =
            Url::parse(base_url.as_ref()).map_err(|e| FigmaApiError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FigmaApiError::InvalidUrl(format!(
                "{base_url} cannot be used as a base URL"
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("figma-mcp-bridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerClient {
                http,
                base_url,
                token: token.into(),
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Fetch a file document, optionally limited to `depth` levels.
    pub async fn get_file(
        &self,
        file_key: &str,
        depth: Option<u32>,
    ) -> Result<FileResponse, FigmaApiError> {
        let query: Vec<(&str, String)> = depth.map(|d| ("depth", d.to_string())).into_iter().collect();
        self.get(&["files", file_key], &query).await
    }

    /// Fetch specific nodes (with subtrees) of a file.
    pub async fn get_file_nodes(
        &self,
        file_key: &str,
        node_ids: &[&str],
    ) -> Result<FileNodesResponse, FigmaApiError> {
        self.get(
            &["files", file_key, "nodes"],
            &[("ids", node_ids.join(","))],
        )
        .await
    }

    /// Render nodes to images and return their temporary URLs.
    pub async fn get_images(
        &self,
        file_key: &str,
        node_ids: &[&str],
        options: &ImageOptions,
    ) -> Result<ImagesResponse, FigmaApiError> {
        let mut query = options.query();
        query.push(("ids", node_ids.join(",")));
        self.get(&["images", file_key], &query).await
    }

    /// Download URLs of every image fill used in a file.
    pub async fn get_image_fills(&self, file_key: &str) -> Result<ImageFillsResponse, FigmaApiError> {
        self.get(&["files", file_key, "images"], &[]).await
    }

    /// List comments, optionally with markdown bodies.
    pub async fn get_comments(
        &self,
        file_key: &str,
        as_md: bool,
    ) -> Result<Vec<Comment>, FigmaApiError> {
        let query: Vec<(&str, String)> = if as_md {
            vec![("as_md", "true".to_string())]
        } else {
            Vec::new()
        };
        let response: CommentsResponse = self.get(&["files", file_key, "comments"], &query).await?;
        Ok(response.comments)
    }

    /// Post a comment and return it as stored.
    pub async fn post_comment(
        &self,
        file_key: &str,
        comment: &PostComment,
    ) -> Result<Comment, FigmaApiError> {
        let url = self.endpoint(&["files", file_key, "comments"])?;
        debug!(url = %url, "Figma API POST");
        let response = self
            .inner
            .http
            .post(url)
            .header(TOKEN_HEADER, self.inner.token.as_str())
            .json(comment)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Version history of a file.
    pub async fn get_file_versions(&self, file_key: &str) -> Result<VersionsResponse, FigmaApiError> {
        self.get(&["files", file_key, "versions"], &[]).await
    }

    /// Projects of a team.
    pub async fn get_team_projects(
        &self,
        team_id: &str,
    ) -> Result<TeamProjectsResponse, FigmaApiError> {
        self.get(&["teams", team_id, "projects"], &[]).await
    }

    /// Files of a project.
    pub async fn get_project_files(
        &self,
        project_id: &str,
    ) -> Result<ProjectFilesResponse, FigmaApiError> {
        self.get(&["projects", project_id, "files"], &[]).await
    }

    /// Published components of a team library.
    pub async fn get_team_components(
        &self,
        team_id: &str,
        page: Pagination,
    ) -> Result<ComponentList, FigmaApiError> {
        let response: MetaResponse<ComponentList> = self
            .get(&["teams", team_id, "components"], &page.query())
            .await?;
        Ok(response.meta)
    }

    /// Published components of a file.
    pub async fn get_file_components(&self, file_key: &str) -> Result<ComponentList, FigmaApiError> {
        let response: MetaResponse<ComponentList> =
            self.get(&["files", file_key, "components"], &[]).await?;
        Ok(response.meta)
    }

    /// A single published component by key.
    pub async fn get_component(&self, key: &str) -> Result<ComponentMeta, FigmaApiError> {
        let response: MetaResponse<ComponentMeta> = self.get(&["components", key], &[]).await?;
        Ok(response.meta)
    }

    /// Published component sets of a team library.
    pub async fn get_team_component_sets(
        &self,
        team_id: &str,
        page: Pagination,
    ) -> Result<ComponentSetList, FigmaApiError> {
        let response: MetaResponse<ComponentSetList> = self
            .get(&["teams", team_id, "component_sets"], &page.query())
            .await?;
        Ok(response.meta)
    }

    /// Published component sets of a file.
    pub async fn get_file_component_sets(
        &self,
        file_key: &str,
    ) -> Result<ComponentSetList, FigmaApiError> {
        let response: MetaResponse<ComponentSetList> =
            self.get(&["files", file_key, "component_sets"], &[]).await?;
        Ok(response.meta)
    }

    /// A single published component set by key.
    pub async fn get_component_set(&self, key: &str) -> Result<ComponentSetMeta, FigmaApiError> {
        let response: MetaResponse<ComponentSetMeta> =
            self.get(&["component_sets", key], &[]).await?;
        Ok(response.meta)
    }

    /// Published styles of a team library.
    pub async fn get_team_styles(
        &self,
        team_id: &str,
        page: Pagination,
    ) -> Result<StyleList, FigmaApiError> {
        let response: MetaResponse<StyleList> = self
            .get(&["teams", team_id, "styles"], &page.query())
            .await?;
        Ok(response.meta)
    }

    /// Published styles of a file.
    pub async fn get_file_styles(&self, file_key: &str) -> Result<StyleList, FigmaApiError> {
        let response: MetaResponse<StyleList> =
            self.get(&["files", file_key, "styles"], &[]).await?;
        Ok(response.meta)
    }

    /// A single published style by key.
    pub async fn get_style(&self, key: &str) -> Result<StyleMeta, FigmaApiError> {
        let response: MetaResponse<StyleMeta> = self.get(&["styles", key], &[]).await?;
        Ok(response.meta)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FigmaApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FigmaApiError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<T, FigmaApiError>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "Figma API GET");
        let response = self
            .inner
            .http
            .get(url)
            .header(TOKEN_HEADER, self.inner.token.as_str())
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T>(response: Response) -> Result<T, FigmaApiError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("err")
                        .or_else(|| v.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(FigmaApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_with_mock(server: &MockServer) -> FigmaClient {
        FigmaClient::with_base_url("test-token", format!("{}/v1", server.uri())).expect("client")
    }

    #[test]
    fn rejects_invalid_base_url() {
        let err = FigmaClient::with_base_url("t", "not a url").unwrap_err();
        assert!(matches!(err, FigmaApiError::InvalidUrl(_)));
    }

    #[test]
    fn endpoint_appends_segments_to_base_path() {
        let client = FigmaClient::with_base_url("t", "https://example.com/v1/").expect("client");
        let url = client.endpoint(&["files", "abc", "nodes"]).expect("url");
        assert_eq!(url.as_str(), "https://example.com/v1/files/abc/nodes");
    }

    #[test]
    fn image_options_only_emit_set_fields() {
        let options = ImageOptions {
            format: Some(ImageFormat::Svg),
            scale: Some(2.0),
            ..ImageOptions::default()
        };
        assert_eq!(
            options.query(),
            vec![("format", "svg".to_string()), ("scale", "2".to_string())]
        );
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn get_file_sends_token_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/files/abc"))
            .and(header("X-Figma-Token", "test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Design System",
                "lastModified": "2024-01-01T00:00:00Z",
                "document": {"id": "0:0", "name": "Document", "type": "DOCUMENT", "children": []},
                "components": {"1:1": {"key": "k"}},
                "componentSets": {},
                "styles": {},
                "version": "123"
            })))
            .mount(&server)
            .await;

        let file = client_with_mock(&server)
            .get_file("abc", None)
            .await
            .expect("file");
        assert_eq!(file.name, "Design System");
        assert_eq!(file.components.len(), 1);
        assert_eq!(file.extra["version"], "123");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn get_file_nodes_joins_ids() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/files/abc/nodes"))
            .and(query_param("ids", "1:2,3:4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Design",
                "nodes": {
                    "1:2": {"document": {"id": "1:2", "name": "Card", "type": "FRAME"}},
                    "3:4": null
                }
            })))
            .mount(&server)
            .await;

        let nodes = client_with_mock(&server)
            .get_file_nodes("abc", &["1:2", "3:4"])
            .await
            .expect("nodes");
        assert_eq!(
            nodes.nodes["1:2"].as_ref().map(|n| n.document.name.as_str()),
            Some("Card")
        );
        assert!(nodes.nodes["3:4"].is_none());
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn error_status_surfaces_api_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/files/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"status": 404, "err": "Not found"})),
            )
            .mount(&server)
            .await;

        let err = client_with_mock(&server)
            .get_file("missing", None)
            .await
            .unwrap_err();
        match err {
            FigmaApiError::Status { status, ref message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Figma API error 404: Not found");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn forbidden_is_unauthorized() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/files/abc/versions"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Invalid token"))
            .mount(&server)
            .await;

        let err = client_with_mock(&server)
            .get_file_versions("abc")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("Invalid token"));
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn post_comment_sends_client_meta() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/files/abc/comments"))
            .and(body_json(json!({
                "message": "Nice",
                "client_meta": {"node_id": "1:2", "node_offset": {"x": 0.0, "y": 0.0}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "c1",
                "message": "Nice",
                "created_at": "2024-02-02T10:00:00Z",
                "user": {"id": "u1", "handle": "ada", "img_url": ""}
            })))
            .mount(&server)
            .await;

        let comment = client_with_mock(&server)
            .post_comment("abc", &PostComment::new("Nice").on_node("1:2"))
            .await
            .expect("comment");
        assert_eq!(comment.id, "c1");
        assert_eq!(comment.user.handle, "ada");
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn file_components_unwrap_meta_envelope() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/files/abc/components"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 200,
                "error": false,
                "meta": {"components": [
                    {"key": "k1", "name": "Button", "description": "Primary", "node_id": "1:1"}
                ]}
            })))
            .mount(&server)
            .await;

        let list = client_with_mock(&server)
            .get_file_components("abc")
            .await
            .expect("components");
        assert_eq!(list.components.len(), 1);
        assert_eq!(list.components[0].name, "Button");
        assert!(!list.components[0].remote);
    }

    #[tokio::test]
    #[cfg_attr(
        target_os = "macos",
        ignore = "wiremock/reqwest system-configuration issue on macOS"
    )]
    async fn team_styles_pass_pagination() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/teams/t1/styles"))
            .and(query_param("page_size", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": 200,
                "error": false,
                "meta": {"styles": [{"key": "s1", "name": "Primary", "style_type": "FILL"}]}
            })))
            .mount(&server)
            .await;

        let styles = client_with_mock(&server)
            .get_team_styles(
                "t1",
                Pagination {
                    page_size: Some(10),
                    ..Pagination::default()
                },
            )
            .await
            .expect("styles");
        assert_eq!(styles.styles[0].style_type, "FILL");
    }
}
