//! Remote document API
//!
//! The contracts the client core consumes from the backend, and the wire
//! shapes exchanged with it. The core only sees the traits; `http` holds the
//! reqwest-backed implementation.

pub mod http;
pub mod otp;

pub use http::HttpDocumentApi;
pub use otp::{OtpGateway, StaticOtpGateway, VerifiedUser};

use crate::error::{AppError, Result};
use crate::models::{id_from_string_or_number, parse_calendar_date, DocumentRecord, FileRef, MajorHead};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend operations on documents
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn search_documents(&self, request: &SearchRequest) -> Result<SearchResponse>;

    async fn upload_document(&self, payload: UploadPayload) -> Result<UploadResponse>;

    async fn list_tags(&self, term: &str) -> Result<TagListResponse>;

    /// Fetch the bytes behind a file URL returned by search
    async fn fetch_file(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch a document's file by id
    async fn download_document(&self, document_id: &str) -> Result<Vec<u8>>;

    /// Fetch several documents as one archive
    async fn download_multiple(&self, document_ids: &[String]) -> Result<Vec<u8>>;
}

//=========================================================================================
// Search
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagName {
    pub tag_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchText {
    pub value: String,
}

/// Paginated search request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub major_head: String,
    pub minor_head: String,
    /// `YYYY-MM-DD` or empty
    pub from_date: String,
    /// `YYYY-MM-DD` or empty
    pub to_date: String,
    pub tags: Vec<TagName>,
    pub uploaded_by: String,
    pub start: usize,
    pub length: usize,
    #[serde(rename = "filterId")]
    pub filter_id: String,
    pub search: SearchText,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub status: bool,
    #[serde(default)]
    pub data: Vec<RemoteDocument>,
    #[serde(rename = "recordsTotal", default)]
    pub records_total: usize,
    #[serde(default)]
    pub message: Option<String>,
}

/// Tags arrive either as plain strings or as `{tag_name}` objects
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RemoteTag {
    Name(String),
    Object { tag_name: String },
}

impl RemoteTag {
    fn into_name(self) -> String {
        match self {
            RemoteTag::Name(name) => name,
            RemoteTag::Object { tag_name } => tag_name,
        }
    }
}

/// A document as returned by the search endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDocument {
    #[serde(alias = "id", deserialize_with = "id_from_string_or_number")]
    pub document_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(alias = "date")]
    pub document_date: String,
    pub major_head: MajorHead,
    #[serde(default)]
    pub minor_head: String,
    #[serde(default)]
    pub tags: Vec<RemoteTag>,
    #[serde(default, alias = "remarks")]
    pub document_remarks: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default)]
    pub upload_time: Option<String>,
}

impl RemoteDocument {
    pub fn into_record(self) -> Result<DocumentRecord> {
        let date = parse_calendar_date(&self.document_date).ok_or_else(|| {
            AppError::Remote(format!(
                "Document {} has an invalid date: {}",
                self.document_id, self.document_date
            ))
        })?;

        let uri = self.file_url.unwrap_or_default();
        let mime_type = normalize_mime(self.file_type.as_deref(), &uri);
        let name = uri
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);

        let upload_time = self.upload_time.as_deref().and_then(parse_timestamp);

        Ok(DocumentRecord {
            id: self.document_id,
            title: self.title,
            date,
            major_head: self.major_head,
            minor_head: self.minor_head,
            tags: self.tags.into_iter().map(RemoteTag::into_name).collect(),
            remarks: self.document_remarks,
            file: FileRef {
                uri,
                mime_type,
                name,
                size: None,
            },
            uploaded_by: self.uploaded_by,
            upload_time,
        })
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Turn the backend's loose `file_type` ("pdf", "image", or a real MIME type)
/// into a MIME type, falling back to the URL extension.
pub fn normalize_mime(file_type: Option<&str>, uri: &str) -> Option<String> {
    match file_type.map(str::trim) {
        Some(t) if t.contains('/') => return Some(t.to_string()),
        Some("pdf") => return Some("application/pdf".to_string()),
        _ => {}
    }

    let extension = uri
        .rsplit('.')
        .next()
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let guessed = match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    };

    guessed
        .map(str::to_string)
        .or_else(|| match file_type {
            Some("image") => Some("image/jpeg".to_string()),
            _ => None,
        })
}

//=========================================================================================
// Upload
//=========================================================================================

/// JSON metadata sent in the `data` part of the upload form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadMetadata {
    pub major_head: String,
    pub minor_head: String,
    /// `DD-MM-YYYY`
    pub document_date: String,
    pub document_remarks: String,
    pub tags: Vec<TagName>,
    pub user_id: String,
}

/// Everything needed to build the multipart upload
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub metadata: UploadMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub status: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub message: Option<String>,
}

//=========================================================================================
// Tags
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TagQuery {
    pub term: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagLabel {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagListResponse {
    pub status: bool,
    #[serde(default)]
    pub data: Vec<TagLabel>,
}
