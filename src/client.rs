//! Google Drive v3 implementation of [`RemoteStorage`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, CreateMetadata, FileListResponse, FileRecord, NewFile};
use crate::storage::{ListRequest, RemoteStorage, RECORD_FIELDS};

/// Base URL for Google Drive API v3.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Upload URL for Google Drive API.
pub const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Largest page size the files.list endpoint accepts.
const MAX_PAGE_SIZE: u32 = 1000;

/// Client for the "My Drive" space of one account.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(auth: Authenticator) -> Self {
        Self::with_endpoints(auth, DRIVE_API_BASE, UPLOAD_API_BASE)
    }

    /// Create a client against custom endpoint roots (proxies, test servers).
    pub fn with_endpoints(auth: Authenticator, api_base: &str, upload_base: &str) -> Self {
        Self {
            auth,
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        }
    }

    async fn download_bytes(&self, url: String, query: &[(&str, &str)]) -> Result<Vec<u8>> {
        let token = self.auth.get_access_token().await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(query)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turn a non-success response into [`DriveError::ApiError`], preferring the
/// structured Google error body when one is present.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }
    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}

#[async_trait]
impl RemoteStorage for DriveClient {
    async fn list(&self, request: &ListRequest) -> Result<Vec<FileRecord>> {
        let token = self.auth.get_access_token().await?;
        let fields = format!("nextPageToken, files({})", request.fields);
        let page_size = request.page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut http_request = self
                .http
                .get(format!("{}/files", self.api_base))
                .bearer_auth(&token)
                .query(&[
                    ("pageSize", page_size.as_str()),
                    ("spaces", "drive"),
                    ("fields", fields.as_str()),
                ]);

            if let Some(ref query) = request.query {
                http_request = http_request.query(&[("q", query)]);
            }
            if let Some(ref token) = page_token {
                http_request = http_request.query(&[("pageToken", token)]);
            }

            let response = check_status(http_request.send().await?).await?;
            let list_response: FileListResponse = response.json().await?;
            all_files.extend(list_response.files);

            if let Some(limit) = request.limit {
                if all_files.len() >= limit {
                    all_files.truncate(limit);
                    break;
                }
            }

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = all_files.len(), query = ?request.query, "listed files");
        Ok(all_files)
    }

    async fn get(&self, file_id: &str) -> Result<Vec<u8>> {
        self.download_bytes(
            format!("{}/files/{}", self.api_base, file_id),
            &[("alt", "media")],
        )
        .await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        self.download_bytes(
            format!("{}/files/{}/export", self.api_base, file_id),
            &[("mimeType", mime_type)],
        )
        .await
    }

    async fn create(&self, metadata: &NewFile, content: Vec<u8>) -> Result<FileRecord> {
        let token = self.auth.get_access_token().await?;

        let body = CreateMetadata {
            name: &metadata.name,
            description: &metadata.description,
            mime_type: &metadata.mime_type,
        };
        let metadata_part =
            Part::text(serde_json::to_string(&body)?).mime_str("application/json; charset=UTF-8")?;
        let file_part = Part::bytes(content)
            .file_name(metadata.name.clone())
            .mime_str(&metadata.content_type)?;

        let form = Form::new()
            .part("metadata", metadata_part)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("fields", RECORD_FIELDS)])
            .multipart(form)
            .send()
            .await?;

        let record: FileRecord = check_status(response).await?.json().await?;
        Ok(record)
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .delete(format!("{}/files/{}", self.api_base, file_id))
            .bearer_auth(&token)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}
