//! Remote storage capability consumed by the catalog.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FileRecord, NewFile, FOLDER_MIME_TYPE};

/// Fields requested for each listed file.
pub const RECORD_FIELDS: &str = "id, name, mimeType";

/// Name of a remote call, carried in [`crate::CatalogError::RemoteOperationFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    List,
    Get,
    Export,
    Create,
    Delete,
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteOperation::List => "list",
            RemoteOperation::Get => "get",
            RemoteOperation::Export => "export",
            RemoteOperation::Create => "create",
            RemoteOperation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Parameters of a `list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Drive query expression; `None` lists everything visible.
    pub query: Option<String>,
    pub page_size: u32,
    /// Stop paging once this many records have been collected.
    pub limit: Option<usize>,
    pub fields: String,
}

impl ListRequest {
    pub fn new(query: Option<String>, page_size: u32) -> Self {
        Self {
            query,
            page_size,
            limit: None,
            fields: RECORD_FIELDS.to_string(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Object-storage operations keyed by opaque file ids.
///
/// Implementations own retries, auth and timeouts; every failure is passed
/// through to the caller unchanged.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    async fn list(&self, request: &ListRequest) -> Result<Vec<FileRecord>>;

    /// Stored bytes of a binary file.
    async fn get(&self, file_id: &str) -> Result<Vec<u8>>;

    /// A native document converted to `mime_type`.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>>;

    async fn create(&self, metadata: &NewFile, content: Vec<u8>) -> Result<FileRecord>;

    async fn delete(&self, file_id: &str) -> Result<()>;
}

/// Escape a value for use inside a single-quoted Drive query literal.
pub fn quote_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Query matching non-trashed folders named `name`.
pub fn folder_lookup_query(name: &str) -> String {
    format!(
        "(name = '{}') and (mimeType = '{}') and (trashed = false)",
        quote_literal(name),
        FOLDER_MIME_TYPE
    )
}

/// Query matching non-folder, non-trashed children of `folder_id`.
pub fn folder_children_query(folder_id: &str) -> String {
    format!(
        "('{}' in parents) and (mimeType != '{}') and (trashed = false)",
        quote_literal(folder_id),
        FOLDER_MIME_TYPE
    )
}
