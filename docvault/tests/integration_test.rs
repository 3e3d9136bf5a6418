//! Integration tests for docvault
//!
//! These tests drive the public API end to end:
//! - Local index persistence on SQLite
//! - Local and remote search with pagination
//! - Search session ordering guarantees
//! - Login, upload and logout through the app context

use async_trait::async_trait;
use docvault::app::ApiConnector;
use docvault::config::{ClientConfig, SearchStrategy, DOCUMENTS_KEY};
use docvault::database::{create_pool, SqliteStore};
use docvault::models::{parse_calendar_date, DocumentRecord, FileRef, MajorHead};
use docvault::remote::{
    DocumentApi, RemoteDocument, SearchRequest, SearchResponse, StaticOtpGateway,
    TagListResponse, UploadPayload, UploadResponse,
};
use docvault::services::{
    load_more, DocumentIndex, LocalBackend, RemoteBackend, ResultSet, SearchBackend,
    SearchFilter, SearchOutcome, SearchSession, UploadForm,
};
use docvault::storage::{FileCache, MemoryStore, PersistedStore};
use docvault::AppContext;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn record(id: &str, major_head: MajorHead, minor_head: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.to_string(),
        title: Some(format!("Document {}", id)),
        date: parse_calendar_date("2024-04-01").unwrap(),
        major_head,
        minor_head: minor_head.to_string(),
        tags: vec!["Scan".to_string()],
        remarks: None,
        file: FileRef::default(),
        uploaded_by: None,
        upload_time: None,
    }
}

/// Remote API serving a fixed catalogue `total` documents long
struct PagedApi {
    total: usize,
    requests: Mutex<Vec<SearchRequest>>,
}

impl PagedApi {
    fn new(total: usize) -> Arc<Self> {
        Arc::new(Self {
            total,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl DocumentApi for PagedApi {
    async fn search_documents(&self, request: &SearchRequest) -> docvault::Result<SearchResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let end = (request.start + request.length).min(self.total);
        let data = (request.start..end)
            .map(|n| {
                serde_json::from_value::<RemoteDocument>(serde_json::json!({
                    "document_id": n,
                    "document_date": "2024-04-01",
                    "major_head": "Personal",
                    "minor_head": "John",
                    "file_url": format!("https://files.example.com/{}.jpg", n),
                }))
                .unwrap()
            })
            .collect();

        Ok(SearchResponse {
            status: true,
            data,
            records_total: self.total,
            message: None,
        })
    }

    async fn upload_document(&self, _payload: UploadPayload) -> docvault::Result<UploadResponse> {
        Ok(UploadResponse {
            status: true,
            data: serde_json::Value::Null,
            message: None,
        })
    }

    async fn list_tags(&self, _term: &str) -> docvault::Result<TagListResponse> {
        Ok(TagListResponse {
            status: true,
            data: Vec::new(),
        })
    }

    async fn fetch_file(&self, _url: &str) -> docvault::Result<Vec<u8>> {
        Ok(b"jpeg".to_vec())
    }

    async fn download_document(&self, _document_id: &str) -> docvault::Result<Vec<u8>> {
        Ok(b"jpeg".to_vec())
    }

    async fn download_multiple(&self, _document_ids: &[String]) -> docvault::Result<Vec<u8>> {
        Ok(b"zip".to_vec())
    }
}

#[tokio::test]
async fn test_local_index_on_sqlite() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("docvault.db");

    {
        let store = Arc::new(SqliteStore::new(create_pool(&db_path).await.unwrap()));
        let index = DocumentIndex::new(store);
        for (id, major, minor) in [
            ("1", MajorHead::Personal, "John"),
            ("2", MajorHead::Personal, "Emily"),
            ("3", MajorHead::Personal, "Tom"),
            ("4", MajorHead::Professional, "IT"),
        ] {
            index.append(&record(id, major, minor)).await.unwrap();
        }
    }

    let store = Arc::new(SqliteStore::new(create_pool(&db_path).await.unwrap()));
    let backend = LocalBackend::new(DocumentIndex::new(store));

    let mut filter = SearchFilter::default();
    filter.set_major_head(Some(MajorHead::Personal));
    let page = backend.search(&filter).await.unwrap();

    let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(page.total_count, 3);
}

#[tokio::test]
async fn test_remote_pagination_with_load_more() {
    let api = PagedApi::new(10);
    let backend = RemoteBackend::new(api.clone(), "9876543210", Duration::from_secs(5));
    let filter = SearchFilter::with_page_size(2);

    let first = ResultSet::first(backend.search(&filter).await.unwrap());
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.total_count, 10);

    let next = load_more(&backend, &first, &filter).await.unwrap();
    assert_eq!(next.records.len(), 4);
    assert_eq!(next.total_count, 10);
    assert_eq!(next.page, 1);
    assert_eq!(next.records[..2], first.records[..]);

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests[1].start, 2);
    assert_eq!(requests[1].length, 2);
}

#[tokio::test]
async fn test_session_pages_through_everything() {
    let session = SearchSession::new(
        Arc::new(RemoteBackend::new(
            PagedApi::new(5),
            "9876543210",
            Duration::from_secs(5),
        )),
        2,
    );

    let SearchOutcome::Applied(snapshot) = session
        .search(SearchFilter::with_page_size(2))
        .await
        .unwrap()
    else {
        panic!("search was not applied");
    };
    assert_eq!(snapshot.results.records.len(), 2);

    while snapshot_has_more(&session) {
        session.load_more().await.unwrap();
    }

    let snapshot = session.snapshot();
    let ids: Vec<_> = snapshot.results.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
}

fn snapshot_has_more(session: &SearchSession) -> bool {
    session.snapshot().results.has_more()
}

#[tokio::test]
async fn test_concurrent_appends_on_shared_index() {
    let index = DocumentIndex::new(Arc::new(MemoryStore::new()));

    let tasks: Vec<_> = (0..25)
        .map(|n| {
            let index = index.clone();
            tokio::spawn(async move {
                let id = index.next_local_id();
                let mut doc = record(&id, MajorHead::Professional, "HR");
                doc.title = Some(format!("Scan {}", n));
                index.append(&doc).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let records = index.load_all().await.unwrap();
    assert_eq!(records.len(), 25);

    let mut ids: Vec<_> = records.iter().map(|r| r.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 25);
}

#[tokio::test]
async fn test_login_upload_search_logout() {
    let temp_dir = TempDir::new().unwrap();
    let config = ClientConfig {
        data_dir: temp_dir.path().to_path_buf(),
        search_strategy: SearchStrategy::Local,
        ..ClientConfig::default()
    };
    let store = MemoryStore::new();
    let cache = FileCache::new(config.file_cache_dir());
    cache.initialize().await.unwrap();
    let api = PagedApi::new(0);
    let connect: ApiConnector =
        Arc::new(move |_: Option<&str>| -> Arc<dyn DocumentApi> { api.clone() });

    let ctx = AppContext::new(
        config,
        Arc::new(store.clone()),
        Arc::new(StaticOtpGateway::default()),
        connect,
        cache,
    );

    assert!(ctx.login("9876543210", "000000").await.is_err());
    let session = ctx.login("9876543210", "123456").await.unwrap();

    let photo = temp_dir.path().join("passport.jpg");
    tokio::fs::write(&photo, b"jpeg").await.unwrap();

    let mut form = UploadForm::new(parse_calendar_date("2024-04-02").unwrap());
    form.set_major_head(Some(MajorHead::Personal));
    form.minor_head = Some("Heena".to_string());
    form.add_tag("Passport");
    form.attach_path(&photo);
    let uploaded = session.upload.upload(&form).await.unwrap();

    let search = session.search_session();
    let mut filter = SearchFilter::default();
    filter.tags = vec!["Passport".to_string()];
    search.search(filter).await.unwrap();
    assert_eq!(search.snapshot().results.records, vec![uploaded.clone()]);

    let downloaded = session.downloads.download(&uploaded).await.unwrap();
    assert_eq!(tokio::fs::read(&downloaded.path).await.unwrap(), b"jpeg");

    ctx.logout(session).await.unwrap();
    assert!(store.get(DOCUMENTS_KEY).await.unwrap().is_none());
    assert!(ctx.restore_session().await.is_none());
}
