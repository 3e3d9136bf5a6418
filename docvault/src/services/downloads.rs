//! Preview and download
//!
//! Images preview in place; PDFs have to be downloaded and handed to an
//! external viewer. Downloaded bytes land in the file cache.

use crate::error::{AppError, Result};
use crate::models::DocumentRecord;
use crate::remote::DocumentApi;
use crate::services::session::NOTHING_SELECTED_NOTICE;
use crate::services::upload::local_path;
use crate::storage::FileCache;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PreviewKind {
    Image,
    /// Needs downloading and an external viewer
    Pdf,
    Unsupported,
}

pub fn preview_kind(record: &DocumentRecord) -> PreviewKind {
    if record.file.is_image() {
        PreviewKind::Image
    } else if record.file.is_pdf() {
        PreviewKind::Pdf
    } else {
        PreviewKind::Unsupported
    }
}

/// A file saved to the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedFile {
    pub document_ids: Vec<String>,
    pub name: String,
    pub mime_type: Option<String>,
    pub hash: String,
    pub path: PathBuf,
    pub size: u64,
    pub downloaded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DownloadService {
    api: Arc<dyn DocumentApi>,
    cache: FileCache,
    downloaded: Arc<Mutex<Vec<DownloadedFile>>>,
}

impl DownloadService {
    pub fn new(api: Arc<dyn DocumentApi>, cache: FileCache) -> Self {
        Self {
            api,
            cache,
            downloaded: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Download one document's file
    pub async fn download(&self, record: &DocumentRecord) -> Result<DownloadedFile> {
        let uri = record.file.uri.trim();

        let bytes = if uri.is_empty() {
            self.api.download_document(&record.id).await?
        } else if uri.starts_with("http://") || uri.starts_with("https://") {
            self.api.fetch_file(uri).await?
        } else {
            tokio::fs::read(local_path(uri)).await?
        };

        self.save(
            vec![record.id.clone()],
            record.display_name(),
            record.file.mime_type.clone(),
            &bytes,
        )
        .await
    }

    /// Download a document known only by id
    pub async fn download_by_id(&self, document_id: &str) -> Result<DownloadedFile> {
        let bytes = self.api.download_document(document_id).await?;
        self.save(
            vec![document_id.to_string()],
            format!("Document #{}", document_id),
            None,
            &bytes,
        )
        .await
    }

    /// Download several documents as one archive
    pub async fn download_selected(&self, document_ids: &[String]) -> Result<DownloadedFile> {
        if document_ids.is_empty() {
            return Err(AppError::Validation(NOTHING_SELECTED_NOTICE.to_string()));
        }

        tracing::info!("Downloading {} selected documents", document_ids.len());
        let bytes = self.api.download_multiple(document_ids).await?;

        self.save(
            document_ids.to_vec(),
            format!("documents-{}.zip", Utc::now().format("%Y%m%d-%H%M%S")),
            Some("application/zip".to_string()),
            &bytes,
        )
        .await
    }

    /// Files downloaded during this session, oldest first
    pub fn downloaded(&self) -> Vec<DownloadedFile> {
        self.downloaded
            .lock()
            .map(|files| files.clone())
            .unwrap_or_default()
    }

    async fn save(
        &self,
        document_ids: Vec<String>,
        name: String,
        mime_type: Option<String>,
        bytes: &[u8],
    ) -> Result<DownloadedFile> {
        let hash = self.cache.put(bytes).await?;

        let file = DownloadedFile {
            document_ids,
            name,
            mime_type,
            path: self.cache.path_for(&hash)?,
            hash,
            size: bytes.len() as u64,
            downloaded_at: Utc::now(),
        };

        tracing::info!("Downloaded {} ({} bytes)", file.name, file.size);

        if let Ok(mut files) = self.downloaded.lock() {
            files.push(file.clone());
        }
        Ok(file)
    }
}
