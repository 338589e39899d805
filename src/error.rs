//! Error types for the drive_catalog crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::RemoteOperation;

/// Errors raised by the remote storage layer (HTTP, auth, API responses).
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Failed to read credentials file: {0}")]
    CredentialsFileError(#[from] std::io::Error),

    #[error("Failed to parse credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid URL or ID: {0}")]
    InvalidUrlOrId(String),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),
}

impl DriveError {
    /// HTTP status carried by an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            DriveError::ApiError { status, .. } => Some(*status),
            DriveError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors surfaced by the file catalog to its caller.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Unsupported media kind: {0}")]
    UnsupportedMediaKind(String),

    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    #[error("Remote {operation} failed: {cause}")]
    RemoteOperationFailed {
        operation: RemoteOperation,
        #[source]
        cause: DriveError,
    },

    #[error("Local I/O on {} failed: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A background operation panicked or was cancelled before finishing.
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl CatalogError {
    pub(crate) fn remote(operation: RemoteOperation, cause: DriveError) -> Self {
        CatalogError::RemoteOperationFailed { operation, cause }
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;

/// Result type alias for CatalogError.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
