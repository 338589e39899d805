//! drive_catalog - browse and manage the files of a Google Drive account.
//!
//! This library provides:
//! - A [`Catalog`] that mirrors a listing of remote files and runs refresh,
//!   sort, upload, batch delete and download without blocking its owner
//! - A [`MediaResolver`] mapping file extensions and local MIME types to the
//!   types Drive records
//! - A [`DriveClient`] implementing the [`RemoteStorage`] capability against
//!   the Drive v3 REST API
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use drive_catalog::{Authenticator, Catalog, CatalogConfig, CatalogEvent, DriveClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::from_file("service-account.json")?;
//!     let mut catalog = Catalog::new(Arc::new(DriveClient::new(auth)), CatalogConfig::default());
//!
//!     catalog.refresh(Some("Textures"));
//!     while let Some(event) = catalog.next_event().await {
//!         if let CatalogEvent::RefreshFailed(e) = event {
//!             anyhow::bail!(e);
//!         }
//!     }
//!     for row in catalog.rows() {
//!         println!("{}", row.record);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod file_ref;
pub mod media;
pub mod models;
pub mod storage;

// Re-exports for convenience
pub use auth::Authenticator;
pub use catalog::{
    BusyState, Catalog, CatalogEvent, CatalogRow, CatalogSnapshot, DeleteFailure,
    PresentationSink, SortColumn, UploadReceipt,
};
pub use client::DriveClient;
pub use config::{CatalogConfig, SortOrder};
pub use error::{CatalogError, CatalogResult, DriveError, Result};
pub use file_ref::{parse_file_ref, viewer_url};
pub use media::{MediaBinding, MediaKind, MediaResolver};
pub use models::FileRecord;
pub use storage::{ListRequest, RemoteOperation, RemoteStorage};
