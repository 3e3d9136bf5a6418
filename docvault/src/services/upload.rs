//! Document upload
//!
//! Validates the upload form, sends the file with its metadata, and records
//! the new document in the local index.

use crate::config::{ALLOWED_UPLOAD_MIME_PREFIXES, ALLOWED_UPLOAD_MIME_TYPES};
use crate::error::{AppError, Result};
use crate::models::{add_tag, remove_tag, DocumentRecord, FileRef, MajorHead, UserSession};
use crate::remote::{normalize_mime, DocumentApi, TagName, UploadMetadata, UploadPayload};
use crate::services::index::DocumentIndex;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The state of the upload screen
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    pub major_head: Option<MajorHead>,
    pub minor_head: Option<String>,
    pub document_date: NaiveDate,
    pub tags: Vec<String>,
    pub remarks: String,
    pub title: Option<String>,
    pub file: Option<FileRef>,
}

impl UploadForm {
    pub fn new(document_date: NaiveDate) -> Self {
        Self {
            major_head: None,
            minor_head: None,
            document_date,
            tags: Vec::new(),
            remarks: String::new(),
            title: None,
            file: None,
        }
    }

    pub fn set_major_head(&mut self, major_head: Option<MajorHead>) {
        self.major_head = major_head;
        self.minor_head = None;
    }

    pub fn add_tag(&mut self, tag: &str) -> bool {
        add_tag(&mut self.tags, tag)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        remove_tag(&mut self.tags, tag)
    }

    /// Attach a file from disk, guessing its type from the extension
    pub fn attach_path(&mut self, path: &Path) {
        let uri = path.to_string_lossy().to_string();
        self.file = Some(FileRef {
            mime_type: normalize_mime(None, &uri),
            name: path.file_name().map(|n| n.to_string_lossy().to_string()),
            uri,
            size: None,
        });
    }

    /// Check the form in the order the screen reports problems
    pub fn validate(&self) -> Result<ValidatedUpload> {
        let major_head = self
            .major_head
            .ok_or_else(|| AppError::Validation("Please select a category".to_string()))?;

        let minor_head = self
            .minor_head
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AppError::Validation("Please select a subcategory".to_string()))?;
        if !major_head.accepts_minor_head(minor_head) {
            return Err(AppError::Validation(format!(
                "{} is not a subcategory of {}",
                minor_head, major_head
            )));
        }

        if self.tags.is_empty() {
            return Err(AppError::Validation(
                "Please select at least one tag".to_string(),
            ));
        }

        let file = self
            .file
            .as_ref()
            .filter(|f| !f.uri.trim().is_empty())
            .ok_or_else(|| {
                AppError::Validation("Please select a document or take a photo".to_string())
            })?;

        let mime_type = file
            .mime_type
            .clone()
            .or_else(|| normalize_mime(None, &file.uri))
            .filter(|mime| is_allowed_mime(mime))
            .ok_or_else(|| {
                AppError::Validation("Only images and PDF files can be uploaded".to_string())
            })?;

        Ok(ValidatedUpload {
            major_head,
            minor_head: minor_head.to_string(),
            file: FileRef {
                mime_type: Some(mime_type),
                ..file.clone()
            },
        })
    }
}

/// Checked parts of a form that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedUpload {
    pub major_head: MajorHead,
    pub minor_head: String,
    pub file: FileRef,
}

pub fn is_allowed_mime(mime: &str) -> bool {
    ALLOWED_UPLOAD_MIME_PREFIXES
        .iter()
        .any(|prefix| mime.starts_with(prefix))
        || ALLOWED_UPLOAD_MIME_TYPES.contains(&mime)
}

/// Local filesystem path behind a file URI
pub fn local_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

#[derive(Clone)]
pub struct UploadService {
    api: Arc<dyn DocumentApi>,
    index: DocumentIndex,
    user: UserSession,
}

impl UploadService {
    pub fn new(api: Arc<dyn DocumentApi>, index: DocumentIndex, user: UserSession) -> Self {
        Self { api, index, user }
    }

    /// Upload the form's file and add it to the local index
    pub async fn upload(&self, form: &UploadForm) -> Result<DocumentRecord> {
        let validated = form.validate()?;

        let path = local_path(&validated.file.uri);
        let bytes = tokio::fs::read(&path).await?;
        let file_name = validated
            .file
            .name
            .clone()
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| "document".to_string());
        let mime_type = validated
            .file
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/pdf".to_string());
        let size = bytes.len() as u64;

        tracing::info!(
            "Uploading {} ({} bytes) as {}/{}",
            file_name,
            size,
            validated.major_head,
            validated.minor_head
        );

        let remarks = form.remarks.trim().to_string();
        let payload = UploadPayload {
            file_name: file_name.clone(),
            mime_type: mime_type.clone(),
            bytes,
            metadata: UploadMetadata {
                major_head: validated.major_head.to_string(),
                minor_head: validated.minor_head.clone(),
                document_date: form.document_date.format("%d-%m-%Y").to_string(),
                document_remarks: remarks.clone(),
                tags: form
                    .tags
                    .iter()
                    .map(|tag| TagName {
                        tag_name: tag.clone(),
                    })
                    .collect(),
                user_id: self.user.user_id.clone(),
            },
        };

        let response = self.api.upload_document(payload).await?;
        if !response.status {
            let message = response
                .message
                .unwrap_or_else(|| "Failed to upload document".to_string());
            return Err(AppError::Remote(message));
        }

        let record = DocumentRecord {
            id: self.index.next_local_id(),
            title: form.title.clone().or_else(|| Some(file_name.clone())),
            date: form.document_date,
            major_head: validated.major_head,
            minor_head: validated.minor_head,
            tags: form.tags.clone(),
            remarks: (!remarks.is_empty()).then_some(remarks),
            file: FileRef {
                uri: validated.file.uri,
                mime_type: Some(mime_type),
                name: Some(file_name),
                size: Some(size),
            },
            uploaded_by: Some(self.user.user_id.clone()),
            upload_time: Some(Utc::now()),
        };

        self.index.append(&record).await?;

        tracing::info!("Document uploaded successfully: {}", record.id);
        Ok(record)
    }
}
