//! # Figma API
//!
//! Async client for the Figma REST API (`https://api.figma.com/v1`).
//!
//! - [`FigmaClient`]: one method per endpoint, authenticated with a personal
//!   access token sent as `X-Figma-Token`.
//! - [`types`]: the subset of response payloads the MCP tools read. Fields
//!   not modelled explicitly are kept in `extra` maps so full-JSON output
//!   stays lossless.
//! - [`node`]: helpers for walking a document tree.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod node;
pub mod types;

pub use client::{FigmaApiError, FigmaClient, ImageFormat, ImageOptions, DEFAULT_API_BASE_URL};
pub use types::{
    ClientMeta, Comment, ComponentList, ComponentMeta, ComponentSetList, ComponentSetMeta,
    FileNodesResponse, FileResponse, ImagesResponse, Node, NodeEntry, Pagination, PostComment,
    StyleList, StyleMeta, User, Version, VersionsResponse,
};
