//! Media type resolution between file extensions, local MIME types and
//! the MIME types the remote store records.
//!
//! All lookup tables are built from one ordered list of [`MediaBinding`]s, so
//! the forward and inverse directions can never disagree.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{CatalogError, CatalogResult};

/// File category bridging local and remote MIME conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// No binding exists; a legitimate UI state rather than an error.
    Unknown,
    Png,
    Jpg,
    Mp4,
    Mp3,
    Zip,
    Excel,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MediaKind::Unknown => "UNKNOWN",
            MediaKind::Png => "PNG",
            MediaKind::Jpg => "JPG",
            MediaKind::Mp4 => "MP4",
            MediaKind::Mp3 => "MP3",
            MediaKind::Zip => "ZIP",
            MediaKind::Excel => "EXCEL",
        };
        f.write_str(label)
    }
}

/// One supported media kind and its representation in each column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBinding {
    pub kind: MediaKind,
    pub local_mime_type: &'static str,
    pub remote_mime_type: &'static str,
    /// Extension including the leading dot, lower case.
    pub file_extension: &'static str,
}

impl MediaBinding {
    pub const fn new(
        kind: MediaKind,
        local_mime_type: &'static str,
        remote_mime_type: &'static str,
        file_extension: &'static str,
    ) -> Self {
        Self {
            kind,
            local_mime_type,
            remote_mime_type,
            file_extension,
        }
    }
}

/// Bindings shipped with the crate.
pub const STANDARD_BINDINGS: &[MediaBinding] = &[
    MediaBinding::new(MediaKind::Png, "image/png", "image/png", ".png"),
    MediaBinding::new(MediaKind::Jpg, "image/jpeg", "image/jpeg", ".jpg"),
    MediaBinding::new(MediaKind::Mp4, "video/mp4", "video/mp4", ".mp4"),
    MediaBinding::new(MediaKind::Mp3, "audio/mp3", "audio/mp3", ".mp3"),
    MediaBinding::new(MediaKind::Zip, "application/zip", "application/zip", ".zip"),
    MediaBinding::new(
        MediaKind::Excel,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "application/vnd.google-apps.spreadsheet",
        ".xlsx",
    ),
];

static STANDARD: LazyLock<MediaResolver> = LazyLock::new(|| {
    MediaResolver::new(STANDARD_BINDINGS).expect("standard media bindings are consistent")
});

/// Immutable bidirectional lookup over a set of media bindings.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    bindings: Vec<MediaBinding>,
    by_kind: HashMap<MediaKind, usize>,
    by_local_mime: HashMap<&'static str, usize>,
    by_remote_mime: HashMap<&'static str, usize>,
    by_extension: HashMap<&'static str, usize>,
}

impl MediaResolver {
    /// Build a resolver, rejecting bindings that would make any column
    /// ambiguous or that bind the `Unknown` sentinel.
    pub fn new(bindings: &[MediaBinding]) -> CatalogResult<Self> {
        let mut resolver = Self {
            bindings: bindings.to_vec(),
            by_kind: HashMap::new(),
            by_local_mime: HashMap::new(),
            by_remote_mime: HashMap::new(),
            by_extension: HashMap::new(),
        };

        for (idx, binding) in bindings.iter().enumerate() {
            if binding.kind == MediaKind::Unknown {
                return Err(CatalogError::Config(
                    "the Unknown media kind cannot be bound".to_string(),
                ));
            }
            insert_unique(&mut resolver.by_kind, binding.kind, idx, "media kind")?;
            insert_unique(&mut resolver.by_local_mime, binding.local_mime_type, idx, "local MIME type")?;
            insert_unique(&mut resolver.by_remote_mime, binding.remote_mime_type, idx, "remote MIME type")?;
            insert_unique(&mut resolver.by_extension, binding.file_extension, idx, "file extension")?;
        }

        Ok(resolver)
    }

    /// Shared resolver over [`STANDARD_BINDINGS`].
    pub fn standard() -> &'static MediaResolver {
        &STANDARD
    }

    pub fn bindings(&self) -> &[MediaBinding] {
        &self.bindings
    }

    /// Media kind for the extension of `path`, or `Unknown` when unbound.
    pub fn resolve_from_extension<P: AsRef<Path>>(&self, path: P) -> MediaKind {
        let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return MediaKind::Unknown;
        };
        let key = format!(".{}", ext.to_ascii_lowercase());
        self.by_extension
            .get(key.as_str())
            .map(|&idx| self.bindings[idx].kind)
            .unwrap_or(MediaKind::Unknown)
    }

    /// MIME type of the local file bytes (used for upload content).
    pub fn local_mime(&self, kind: MediaKind) -> CatalogResult<&'static str> {
        Ok(self.binding(kind)?.local_mime_type)
    }

    /// MIME type the remote store records (used for create and export).
    pub fn remote_mime(&self, kind: MediaKind) -> CatalogResult<&'static str> {
        Ok(self.binding(kind)?.remote_mime_type)
    }

    pub fn extension(&self, kind: MediaKind) -> CatalogResult<&'static str> {
        Ok(self.binding(kind)?.file_extension)
    }

    pub fn kind_from_local_mime(&self, mime_type: &str) -> CatalogResult<MediaKind> {
        lookup(&self.by_local_mime, mime_type)
            .map(|idx| self.bindings[idx].kind)
            .ok_or_else(|| CatalogError::UnsupportedMediaKind(format!("local MIME type {}", mime_type)))
    }

    pub fn kind_from_remote_mime(&self, mime_type: &str) -> CatalogResult<MediaKind> {
        lookup(&self.by_remote_mime, mime_type)
            .map(|idx| self.bindings[idx].kind)
            .ok_or_else(|| CatalogError::UnsupportedMediaKind(format!("remote MIME type {}", mime_type)))
    }

    fn binding(&self, kind: MediaKind) -> CatalogResult<&MediaBinding> {
        self.by_kind
            .get(&kind)
            .map(|&idx| &self.bindings[idx])
            .ok_or_else(|| CatalogError::UnsupportedMediaKind(kind.to_string()))
    }
}

impl Default for MediaResolver {
    fn default() -> Self {
        Self::standard().clone()
    }
}

fn lookup(table: &HashMap<&'static str, usize>, key: &str) -> Option<usize> {
    table.get(key).copied()
}

fn insert_unique<K>(table: &mut HashMap<K, usize>, key: K, idx: usize, column: &str) -> CatalogResult<()>
where
    K: Eq + Hash + std::fmt::Debug,
{
    if table.contains_key(&key) {
        return Err(CatalogError::Config(format!(
            "duplicate {} in media bindings: {:?}",
            column, key
        )));
    }
    table.insert(key, idx);
    Ok(())
}
