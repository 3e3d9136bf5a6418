//! Shared fixtures for service tests

use crate::error::{AppError, Result};
use crate::models::{parse_calendar_date, DocumentRecord, FileRef, MajorHead};
use crate::remote::{
    DocumentApi, RemoteDocument, SearchRequest, SearchResponse, TagLabel, TagListResponse,
    UploadPayload, UploadResponse,
};
use crate::storage::{MemoryStore, PersistedStore};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn record(
    id: &str,
    major_head: MajorHead,
    minor_head: &str,
    tags: &[&str],
    date: &str,
) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: None,
        date: parse_calendar_date(date).unwrap(),
        major_head,
        minor_head: minor_head.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        remarks: None,
        file: FileRef::default(),
        uploaded_by: None,
        upload_time: None,
    }
}

/// Store whose reads or writes fail on demand
#[derive(Clone, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_reads: bool,
    fail_writes: bool,
    writes: Arc<AtomicUsize>,
}

impl FailingStore {
    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistedStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(AppError::Store("read failed".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(AppError::Store("write failed".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Scripted remote API that records what it was asked
#[derive(Default)]
pub struct FakeApi {
    pub search_responses: Mutex<VecDeque<Result<SearchResponse>>>,
    pub search_requests: Mutex<Vec<SearchRequest>>,
    pub uploads: Mutex<Vec<UploadPayload>>,
    pub upload_status: Mutex<Option<bool>>,
    pub tags: Mutex<Vec<(String, String)>>,
    pub files: Mutex<HashMap<String, Vec<u8>>>,
    pub batch_requests: Mutex<Vec<Vec<String>>>,
    /// Searches never answer
    pub stalled: AtomicBool,
}

impl FakeApi {
    pub fn push_search(&self, response: Result<SearchResponse>) {
        self.search_responses.lock().unwrap().push_back(response);
    }

    pub fn search_calls(&self) -> usize {
        self.search_requests.lock().unwrap().len()
    }
}

pub fn remote_page(ids: &[&str], total: usize) -> SearchResponse {
    let data = ids
        .iter()
        .map(|id| {
            serde_json::from_value::<RemoteDocument>(serde_json::json!({
                "document_id": id,
                "document_date": "2024-05-01",
                "major_head": "Professional",
                "minor_head": "Accounts",
                "tags": [{"tag_name": "Invoice"}],
                "file_url": format!("https://files.example.com/{}.pdf", id),
            }))
            .unwrap()
        })
        .collect();

    SearchResponse {
        status: true,
        data,
        records_total: total,
        message: None,
    }
}

#[async_trait]
impl DocumentApi for FakeApi {
    async fn search_documents(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.search_requests.lock().unwrap().push(request.clone());
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.search_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(remote_page(&[], 0)))
    }

    async fn upload_document(&self, payload: UploadPayload) -> Result<UploadResponse> {
        self.uploads.lock().unwrap().push(payload);
        let status = self.upload_status.lock().unwrap().unwrap_or(true);
        Ok(UploadResponse {
            status,
            data: serde_json::Value::Null,
            message: None,
        })
    }

    async fn list_tags(&self, term: &str) -> Result<TagListResponse> {
        let data = self
            .tags
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, label)| label.to_lowercase().contains(&term.to_lowercase()))
            .map(|(id, label)| TagLabel {
                id: id.clone(),
                label: label.clone(),
            })
            .collect();
        Ok(TagListResponse { status: true, data })
    }

    async fn fetch_file(&self, url: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::DocumentNotFound(url.to_string()))
    }

    async fn download_document(&self, document_id: &str) -> Result<Vec<u8>> {
        self.fetch_file(&format!("id:{}", document_id)).await
    }

    async fn download_multiple(&self, document_ids: &[String]) -> Result<Vec<u8>> {
        self.batch_requests.lock().unwrap().push(document_ids.to_vec());
        Ok(format!("archive:{}", document_ids.join(",")).into_bytes())
    }
}
