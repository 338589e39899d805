//! Data models for Google Drive API payloads.

use serde::{Deserialize, Serialize};

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by Drive-native document types (Docs, Sheets, Slides...).
const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Catalog entry for one remote file. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl FileRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Native documents have no raw byte representation and must be exported.
    pub fn is_native_document(&self) -> bool {
        is_native_mime(&self.mime_type)
    }
}

/// Whether `mime_type` names a Drive-native (export-only) document type.
pub fn is_native_mime(mime_type: &str) -> bool {
    mime_type.starts_with(NATIVE_MIME_PREFIX)
}

impl std::fmt::Display for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mime = if self.mime_type.is_empty() {
            "-"
        } else {
            &self.mime_type
        };
        write!(f, "{}\t{}\t{}", self.id, mime, self.name)
    }
}

/// Metadata sent along with the bytes of a new file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub description: String,
    /// MIME type the remote store records for the file.
    pub mime_type: String,
    /// Content type of the uploaded bytes.
    pub content_type: String,
}

/// Body of the `files.create` metadata part.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateMetadata<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub mime_type: &'a str,
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_deserialize() {
        let json = r#"{
            "id": "abc123",
            "name": "sheet",
            "mimeType": "application/vnd.google-apps.spreadsheet"
        }"#;

        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "abc123");
        assert_eq!(record.name, "sheet");
        assert!(record.is_native_document());
        assert!(!record.is_folder());
    }

    #[test]
    fn test_file_record_missing_mime() {
        let record: FileRecord = serde_json::from_str(r#"{"id": "x", "name": "y"}"#).unwrap();
        assert_eq!(record.mime_type, "");
        assert_eq!(format!("{}", record), "x\t-\ty");
    }

    #[test]
    fn test_folder_is_native() {
        let folder = FileRecord::new("f", "Assets", FOLDER_MIME_TYPE);
        assert!(folder.is_folder());
        assert!(folder.is_native_document());
        assert!(!is_native_mime("image/png"));
    }

    #[test]
    fn test_create_metadata_serializes_camel_case() {
        let meta = CreateMetadata {
            name: "a.png",
            description: "d",
            mime_type: "image/png",
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["mimeType"], "image/png");
        assert_eq!(json["name"], "a.png");
    }
}
