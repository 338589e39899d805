//! In-memory catalog of remote files and the operations that mutate it.
//!
//! The [`Catalog`] lives on one interactive thread. Every remote or local
//! I/O step runs in a spawned Tokio task; when a task finishes it posts a
//! completion onto a queue that only the catalog drains, through
//! [`Catalog::next_event`] or [`Catalog::drain`]. Snapshot mutation and sink
//! notification therefore only ever happen on the thread that owns the
//! catalog, and the catalog itself is `!Send`.
//!
//! ```no_run
//! use std::sync::Arc;
//! use drive_catalog::{Authenticator, Catalog, CatalogConfig, DriveClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = DriveClient::new(Authenticator::static_token("ya29..."));
//!     let mut catalog = Catalog::new(Arc::new(client), CatalogConfig::default());
//!
//!     catalog.refresh(None);
//!     while let Some(event) = catalog.next_event().await {
//!         println!("{:?}", event);
//!     }
//!     for row in catalog.rows() {
//!         println!("{} {}", row.display_id, row.record);
//!     }
//! }
//! ```

use std::cmp::Ordering;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{CatalogConfig, SortOrder};
use crate::error::{CatalogError, CatalogResult};
use crate::file_ref::viewer_url;
use crate::media::{MediaKind, MediaResolver};
use crate::models::{is_native_mime, FileRecord, NewFile};
use crate::storage::{
    folder_children_query, folder_lookup_query, ListRequest, RemoteOperation, RemoteStorage,
};

/// Names shown by [`Catalog::delete_summary`] before collapsing the rest.
const SUMMARY_NAME_COUNT: usize = 3;

/// Column the snapshot can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Name,
    Id,
    MimeType,
}

impl SortColumn {
    fn key(self, record: &FileRecord) -> &str {
        match self {
            SortColumn::Name => &record.name,
            SortColumn::Id => &record.id,
            SortColumn::MimeType => &record.mime_type,
        }
    }
}

impl FromStr for SortColumn {
    type Err = CatalogError;

    fn from_str(s: &str) -> CatalogResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(SortColumn::Name),
            "id" => Ok(SortColumn::Id),
            "mimetype" | "mime_type" | "mime" => Ok(SortColumn::MimeType),
            _ => Err(CatalogError::Config(format!("unknown sort column: {}", s))),
        }
    }
}

/// A record with its position-based display id.
///
/// Display ids are reassigned `0..n-1` after every sort or refresh, so a
/// selection expressed in display ids is only valid until the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRow {
    pub display_id: usize,
    pub record: FileRecord,
}

/// Ordered records plus the sort that produced the order.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    rows: Vec<CatalogRow>,
    sort: SortOrder,
}

impl CatalogSnapshot {
    fn with_sort(sort: SortOrder) -> Self {
        Self {
            rows: Vec::new(),
            sort,
        }
    }

    pub fn rows(&self) -> &[CatalogRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn find(&self, id: &str) -> Option<&FileRecord> {
        self.rows.iter().map(|r| &r.record).find(|r| r.id == id)
    }

    fn clear(&mut self) {
        self.rows.clear();
    }

    fn replace(&mut self, records: Vec<FileRecord>) {
        self.rows = records
            .into_iter()
            .map(|record| CatalogRow {
                display_id: 0,
                record,
            })
            .collect();
        self.apply_sort();
    }

    fn sort_by(&mut self, column: SortColumn, ascending: bool) {
        self.sort = SortOrder { column, ascending };
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        let SortOrder { column, ascending } = self.sort;
        self.rows.sort_by(|a, b| {
            let ord: Ordering = column.key(&a.record).cmp(column.key(&b.record));
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        self.renumber();
    }

    fn remove_ids(&mut self, ids: &[String]) {
        self.rows.retain(|row| !ids.contains(&row.record.id));
        self.renumber();
    }

    fn renumber(&mut self) {
        for (idx, row) in self.rows.iter_mut().enumerate() {
            row.display_id = idx;
        }
    }
}

/// Gates that keep operations of the same kind from overlapping.
///
/// At most one listing and one batch delete run at a time. Downloads and
/// uploads are counted per operation and may overlap freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusyState {
    pub is_listing: bool,
    pub is_deleting: bool,
    pub downloads: usize,
    pub uploads: usize,
}

impl BusyState {
    pub fn is_downloading(&self) -> bool {
        self.downloads > 0
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads > 0
    }

    pub fn is_busy(&self) -> bool {
        self.is_listing || self.is_deleting || self.is_downloading() || self.is_uploading()
    }
}

/// Receives the ordered rows whenever the snapshot changes.
pub trait PresentationSink {
    fn render(&self, rows: &[CatalogRow]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug)]
pub struct DeleteFailure {
    pub id: String,
    pub error: CatalogError,
}

/// Outcome of a background operation, applied on the interactive thread.
#[derive(Debug)]
pub enum CatalogEvent {
    Refreshed {
        count: usize,
    },
    RefreshFailed(CatalogError),
    Uploaded(UploadReceipt),
    UploadFailed {
        path: PathBuf,
        error: CatalogError,
    },
    Deleted {
        deleted: Vec<String>,
        failures: Vec<DeleteFailure>,
    },
    Downloaded {
        id: String,
        path: PathBuf,
        bytes: usize,
    },
    DownloadFailed {
        id: String,
        error: CatalogError,
    },
}

enum Completion {
    Listing(CatalogResult<Vec<FileRecord>>),
    Upload {
        path: PathBuf,
        result: CatalogResult<UploadReceipt>,
    },
    Delete {
        deleted: Vec<String>,
        failures: Vec<DeleteFailure>,
    },
    Download {
        id: String,
        path: PathBuf,
        result: CatalogResult<usize>,
    },
}

/// Catalog of remote files owned by one interactive thread.
pub struct Catalog {
    storage: Arc<dyn RemoteStorage>,
    resolver: Arc<MediaResolver>,
    config: CatalogConfig,
    snapshot: CatalogSnapshot,
    busy: BusyState,
    folder_filter: Option<String>,
    reconcile_pending: bool,
    in_flight: usize,
    sink: Option<Weak<dyn PresentationSink>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Catalog {
    /// Create an empty catalog. Operations spawn onto the ambient Tokio
    /// runtime, so they must be invoked from within one.
    pub fn new(storage: Arc<dyn RemoteStorage>, config: CatalogConfig) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            storage,
            resolver: Arc::new(MediaResolver::default()),
            snapshot: CatalogSnapshot::with_sort(config.default_sort),
            config,
            busy: BusyState::default(),
            folder_filter: None,
            reconcile_pending: false,
            in_flight: 0,
            sink: None,
            completions_tx,
            completions_rx,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<MediaResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Attach the view that renders rows. Only a weak reference is kept:
    /// once the view is dropped, notifications silently stop.
    pub fn attach_sink<S: PresentationSink + 'static>(&mut self, sink: &Rc<S>) {
        let weak: Weak<S> = Rc::downgrade(sink);
        self.sink = Some(weak);
        self.notify_sink();
    }

    pub fn rows(&self) -> &[CatalogRow] {
        self.snapshot.rows()
    }

    pub fn snapshot(&self) -> &CatalogSnapshot {
        &self.snapshot
    }

    pub fn row(&self, display_id: usize) -> Option<&CatalogRow> {
        self.snapshot.rows().get(display_id)
    }

    /// Record ids for a positional selection; stale display ids are skipped.
    pub fn ids_for_rows(&self, display_ids: &[usize]) -> Vec<String> {
        display_ids
            .iter()
            .filter_map(|&idx| self.row(idx))
            .map(|row| row.record.id.clone())
            .collect()
    }

    pub fn busy(&self) -> BusyState {
        self.busy
    }

    pub fn resolver(&self) -> &MediaResolver {
        &self.resolver
    }

    pub fn folder_filter(&self) -> Option<&str> {
        self.folder_filter.as_deref()
    }

    /// Background operations whose completion has not been applied yet.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    /// Re-list the remote files, optionally only the children of the first
    /// folder named `folder`.
    ///
    /// Returns `false` without doing anything while a listing is in flight.
    pub fn refresh(&mut self, folder: Option<&str>) -> bool {
        if self.busy.is_listing {
            tracing::warn!("Refresh ignored: a listing is already in flight");
            return false;
        }
        self.folder_filter = folder
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        self.start_listing();
        true
    }

    pub fn sort_by(&mut self, column: SortColumn, ascending: bool) {
        self.snapshot.sort_by(column, ascending);
        self.notify_sink();
    }

    /// Upload a local file as `upload_name`. Validation happens before any
    /// remote call; the result arrives as [`CatalogEvent::Uploaded`] or
    /// [`CatalogEvent::UploadFailed`]. The snapshot is left untouched.
    pub fn upload<P: AsRef<Path>>(
        &mut self,
        local_path: P,
        upload_name: &str,
        kind: MediaKind,
    ) -> CatalogResult<()> {
        let path = local_path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(CatalogError::FileNotFound(path));
        }
        let content_type = self.resolver.local_mime(kind)?;
        let mime_type = self.resolver.remote_mime(kind)?;

        let name = match upload_name.trim() {
            "" => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            name => name.to_string(),
        };
        let metadata = NewFile {
            name,
            description: self.config.upload_description.clone(),
            mime_type: mime_type.to_string(),
            content_type: content_type.to_string(),
        };

        tracing::info!("Upload start: {:?} as {} ({})", path, metadata.name, kind);
        self.busy.uploads += 1;
        let storage = Arc::clone(&self.storage);
        let failed_path = path.clone();
        self.spawn(
            async move {
                let result = upload_task(storage.as_ref(), &path, &metadata).await;
                Completion::Upload { path, result }
            },
            move |error| Completion::Upload {
                path: failed_path,
                result: Err(error),
            },
        );
        Ok(())
    }

    /// Delete every id, best effort, then reconcile with a refresh.
    ///
    /// Returns `false` without doing anything while a batch delete is in
    /// flight or when `ids` is empty.
    pub fn delete_many(&mut self, ids: Vec<String>) -> bool {
        if self.busy.is_deleting {
            tracing::warn!("Delete ignored: a batch delete is already in flight");
            return false;
        }
        if ids.is_empty() {
            return false;
        }

        tracing::info!("Deleting {} file(s)", ids.len());
        self.busy.is_deleting = true;
        let storage = Arc::clone(&self.storage);
        let attempted = ids.clone();
        self.spawn(
            async move {
                let mut deleted = Vec::new();
                let mut failures = Vec::new();
                for id in ids {
                    match storage.delete(&id).await {
                        Ok(()) => deleted.push(id),
                        Err(cause) => {
                            tracing::warn!("Delete of {} failed: {}", id, cause);
                            failures.push(DeleteFailure {
                                id,
                                error: CatalogError::remote(RemoteOperation::Delete, cause),
                            });
                        }
                    }
                }
                Completion::Delete { deleted, failures }
            },
            // Which ids went through is unknown; the reconcile refresh sorts it out.
            move |error| {
                let message = error.to_string();
                Completion::Delete {
                    deleted: Vec::new(),
                    failures: attempted
                        .into_iter()
                        .map(|id| DeleteFailure {
                            id,
                            error: CatalogError::TaskFailed(message.clone()),
                        })
                        .collect(),
                }
            },
        );
        true
    }

    /// [`Catalog::delete_many`] over a positional selection.
    pub fn delete_rows(&mut self, display_ids: &[usize]) -> bool {
        let ids = self.ids_for_rows(display_ids);
        self.delete_many(ids)
    }

    /// Confirmation text for deleting the selected rows.
    pub fn delete_summary(&self, display_ids: &[usize]) -> String {
        let rows: Vec<&CatalogRow> = display_ids.iter().filter_map(|&i| self.row(i)).collect();
        let mut message = format!("Delete {} file(s)?\n", rows.len());
        for row in rows.iter().take(SUMMARY_NAME_COUNT) {
            message.push_str(&format!("- {}\n", row.record.name));
        }
        if rows.len() > SUMMARY_NAME_COUNT {
            message.push_str(&format!("and {} more\n", rows.len() - SUMMARY_NAME_COUNT));
        }
        message
    }

    /// Download a file to `destination`, creating or truncating it.
    ///
    /// Native documents are exported to the remote MIME type of `kind`;
    /// everything else is fetched verbatim. Whether a file is native comes
    /// from its snapshot record, or from `kind` when the id is not listed.
    pub fn download<P: AsRef<Path>>(
        &mut self,
        id: &str,
        destination: P,
        kind: MediaKind,
    ) -> CatalogResult<()> {
        let native = match self.snapshot.find(id) {
            Some(record) => record.is_native_document(),
            None => self
                .resolver
                .remote_mime(kind)
                .map(is_native_mime)
                .unwrap_or(false),
        };
        let export_mime = if native {
            Some(self.resolver.remote_mime(kind)?.to_string())
        } else {
            None
        };

        let id = id.to_string();
        let path = destination.as_ref().to_path_buf();
        tracing::info!("Download start: {} -> {:?}", id, path);
        self.busy.downloads += 1;
        let storage = Arc::clone(&self.storage);
        let (failed_id, failed_path) = (id.clone(), path.clone());
        self.spawn(
            async move {
                let result =
                    download_task(storage.as_ref(), &id, export_mime.as_deref(), &path).await;
                Completion::Download { id, path, result }
            },
            move |error| Completion::Download {
                id: failed_id,
                path: failed_path,
                result: Err(error),
            },
        );
        Ok(())
    }

    /// Local file name for a record: its name reduced to a single path
    /// component, plus the extension of the kind its MIME type maps to
    /// unless already present.
    pub fn download_file_name(&self, record: &FileRecord) -> (String, MediaKind) {
        let kind = self
            .resolver
            .kind_from_remote_mime(&record.mime_type)
            .unwrap_or(MediaKind::Unknown);
        let base = local_file_name(&record.name, &record.id);
        let name = match self.resolver.extension(kind) {
            Ok(ext) if !base.to_ascii_lowercase().ends_with(ext) => format!("{}{}", base, ext),
            _ => base,
        };
        (name, kind)
    }

    /// Wait for the next background operation to finish and apply it.
    /// Returns `None` once nothing is in flight.
    pub async fn next_event(&mut self) -> Option<CatalogEvent> {
        if self.in_flight == 0 {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        Some(self.apply(completion))
    }

    /// Apply every completion that is already queued, without waiting.
    pub fn drain(&mut self) -> Vec<CatalogEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            events.push(self.apply(completion));
        }
        events
    }

    fn start_listing(&mut self) {
        self.busy.is_listing = true;
        self.snapshot.clear();
        self.notify_sink();

        let storage = Arc::clone(&self.storage);
        let folder = self.folder_filter.clone();
        let page_size = self.config.page_size;
        let max_records = self.config.max_records;
        tracing::debug!(folder = ?folder, "listing start");
        self.spawn(
            async move {
                Completion::Listing(
                    list_task(storage.as_ref(), folder.as_deref(), page_size, max_records).await,
                )
            },
            |error| Completion::Listing(Err(error)),
        );
    }

    /// Run `task` in the background. If it panics or is cancelled,
    /// `on_failure` builds the completion instead, so busy state always
    /// clears.
    fn spawn<F, E>(&mut self, task: F, on_failure: E)
    where
        F: Future<Output = Completion> + Send + 'static,
        E: FnOnce(CatalogError) -> Completion + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.completions_tx.clone();
        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            let completion = match handle.await {
                Ok(completion) => completion,
                Err(e) => {
                    tracing::error!("Background task failed: {}", e);
                    on_failure(CatalogError::TaskFailed(e.to_string()))
                }
            };
            // The receiver lives as long as the catalog; a closed queue
            // means the catalog is gone and the result has no audience.
            let _ = tx.send(completion);
        });
    }

    fn apply(&mut self, completion: Completion) -> CatalogEvent {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Listing(result) => self.apply_listing(result),
            Completion::Upload { path, result } => {
                self.busy.uploads = self.busy.uploads.saturating_sub(1);
                match result {
                    Ok(receipt) => {
                        tracing::info!("Uploaded {:?} as {} ({})", path, receipt.name, receipt.id);
                        CatalogEvent::Uploaded(receipt)
                    }
                    Err(error) => {
                        tracing::error!("Upload of {:?} failed: {}", path, error);
                        CatalogEvent::UploadFailed { path, error }
                    }
                }
            }
            Completion::Delete { deleted, failures } => {
                self.busy.is_deleting = false;
                self.snapshot.remove_ids(&deleted);
                self.notify_sink();
                if self.busy.is_listing {
                    self.reconcile_pending = true;
                } else {
                    self.start_listing();
                }
                tracing::info!("Deleted {} file(s), {} failed", deleted.len(), failures.len());
                CatalogEvent::Deleted { deleted, failures }
            }
            Completion::Download { id, path, result } => {
                self.busy.downloads = self.busy.downloads.saturating_sub(1);
                match result {
                    Ok(bytes) => {
                        tracing::info!("File saved to: {:?} ({} bytes)", path, bytes);
                        CatalogEvent::Downloaded { id, path, bytes }
                    }
                    Err(error) => {
                        tracing::error!("Download of {} failed: {}", id, error);
                        CatalogEvent::DownloadFailed { id, error }
                    }
                }
            }
        }
    }

    fn apply_listing(&mut self, result: CatalogResult<Vec<FileRecord>>) -> CatalogEvent {
        self.busy.is_listing = false;
        let event = match result {
            Ok(records) => {
                self.snapshot.replace(records);
                self.notify_sink();
                tracing::info!("Listed {} file(s)", self.snapshot.len());
                CatalogEvent::Refreshed {
                    count: self.snapshot.len(),
                }
            }
            Err(error) => {
                tracing::error!("Refresh failed: {}", error);
                CatalogEvent::RefreshFailed(error)
            }
        };

        if self.reconcile_pending {
            self.reconcile_pending = false;
            self.start_listing();
        }
        event
    }

    fn notify_sink(&self) {
        match self.sink.as_ref().and_then(Weak::upgrade) {
            Some(sink) => sink.render(self.snapshot.rows()),
            None => tracing::trace!("no presentation sink attached"),
        }
    }
}

/// Reduce a remote name to one path component. Separators and control
/// characters become `_`; names that would still escape the destination
/// directory fall back to the id.
fn local_file_name(name: &str, id: &str) -> String {
    let component = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if matches!(c, '/' | '\\') || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect::<String>()
            .trim()
            .to_string()
    };

    match component(name) {
        n if n.is_empty() || n == "." || n == ".." => component(id),
        n => n,
    }
}

async fn list_task(
    storage: &dyn RemoteStorage,
    folder: Option<&str>,
    page_size: u32,
    max_records: usize,
) -> CatalogResult<Vec<FileRecord>> {
    let list = |query: Option<String>, limit: usize| async move {
        let request = ListRequest::new(query, page_size).with_limit(limit);
        storage
            .list(&request)
            .await
            .map_err(|cause| CatalogError::remote(RemoteOperation::List, cause))
    };

    let Some(name) = folder else {
        let mut records = list(None, max_records).await?;
        records.truncate(max_records);
        return Ok(records);
    };

    // Same-named folders are not disambiguated: the first match wins.
    let parent = list(Some(folder_lookup_query(name)), 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| CatalogError::FolderNotFound(name.to_string()))?;

    let mut records = list(Some(folder_children_query(&parent.id)), max_records).await?;
    records.truncate(max_records);
    Ok(records)
}

async fn upload_task(
    storage: &dyn RemoteStorage,
    path: &Path,
    metadata: &NewFile,
) -> CatalogResult<UploadReceipt> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| CatalogError::LocalIo {
            path: path.to_path_buf(),
            source,
        })?;

    let record = storage
        .create(metadata, content)
        .await
        .map_err(|cause| CatalogError::remote(RemoteOperation::Create, cause))?;

    Ok(UploadReceipt {
        url: viewer_url(&record.id),
        id: record.id,
        name: record.name,
    })
}

async fn download_task(
    storage: &dyn RemoteStorage,
    id: &str,
    export_mime: Option<&str>,
    path: &Path,
) -> CatalogResult<usize> {
    let bytes = match export_mime {
        Some(mime_type) => storage
            .export(id, mime_type)
            .await
            .map_err(|cause| CatalogError::remote(RemoteOperation::Export, cause))?,
        None => storage
            .get(id)
            .await
            .map_err(|cause| CatalogError::remote(RemoteOperation::Get, cause))?,
    };

    let local_io = |source| CatalogError::LocalIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(local_io)?;
    }
    tokio::fs::write(path, &bytes).await.map_err(local_io)?;
    Ok(bytes.len())
}
