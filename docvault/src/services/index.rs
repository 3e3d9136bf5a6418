//! Local document index
//!
//! The list of documents uploaded from this device, persisted as one JSON array
//! under `documents_data`. The list is append-only: records are never edited
//! or removed individually, only wiped with the rest of the store at logout.

use crate::config::DOCUMENTS_KEY;
use crate::error::Result;
use crate::models::DocumentRecord;
use crate::storage::PersistedStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Locally known document records
#[derive(Clone)]
pub struct DocumentIndex {
    store: Arc<dyn PersistedStore>,
    write_lock: Arc<Mutex<()>>,
    last_id: Arc<AtomicI64>,
}

impl DocumentIndex {
    pub fn new(store: Arc<dyn PersistedStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
            last_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// All decodable records in append order.
    ///
    /// Entries that no longer decode are skipped with a warning; a value that
    /// is not a list reads as empty. Store failures are returned.
    pub async fn load_all(&self) -> Result<Vec<DocumentRecord>> {
        let entries = self.read_entries().await?;
        let mut records = Vec::with_capacity(entries.len());

        for (position, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<DocumentRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable document at position {}: {}", position, e)
                }
            }
        }

        tracing::debug!("Loaded {} documents from local index", records.len());
        Ok(records)
    }

    /// Append a record, keeping everything already stored.
    ///
    /// The read-modify-write runs under the index lock so concurrent appends
    /// never drop each other's records.
    pub async fn append(&self, record: &DocumentRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_entries().await?;
        entries.push(serde_json::to_value(record)?);
        let raw = serde_json::to_string(&entries)?;

        if let Err(e) = self.store.set(DOCUMENTS_KEY, raw).await {
            tracing::warn!("Failed to persist document {}: {}", record.id, e);
            return Err(e);
        }

        tracing::info!("Document {} added to local index ({} total)", record.id, entries.len());
        Ok(())
    }

    /// A fresh id for a locally created record: the current time in
    /// milliseconds, bumped so ids from this index strictly increase.
    pub fn next_local_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);

        now.max(previous + 1).to_string()
    }

    async fn read_entries(&self) -> Result<Vec<Value>> {
        let Some(raw) = self.store.get(DOCUMENTS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => Ok(entries),
            Ok(_) => {
                tracing::warn!("Stored document list is not an array, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!("Stored document list is not valid JSON, treating as empty: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MajorHead;
    use crate::services::testing::{record, FailingStore};
    use crate::storage::MemoryStore;

    fn index_with(store: MemoryStore) -> DocumentIndex {
        DocumentIndex::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_empty_store_loads_nothing() {
        let index = index_with(MemoryStore::new());

        assert!(index.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_appends_preserve_order() {
        let index = index_with(MemoryStore::new());

        for id in ["1", "2", "3"] {
            index
                .append(&record(id, MajorHead::Personal, "John", &["ID"], "2024-01-01"))
                .await
                .unwrap();
        }

        let first = index.load_all().await.unwrap();
        let ids: Vec<_> = first.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        assert_eq!(index.load_all().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_unreadable_entries_are_skipped_but_kept() {
        let store = MemoryStore::new();
        store
            .set(
                DOCUMENTS_KEY,
                r#"[{"id": 1, "date": "2024-01-01", "major_head": "Personal"}, {"garbage": true}]"#
                    .to_string(),
            )
            .await
            .unwrap();
        let index = index_with(store.clone());

        assert_eq!(index.load_all().await.unwrap().len(), 1);

        index
            .append(&record("2", MajorHead::Professional, "HR", &[], "2024-02-01"))
            .await
            .unwrap();

        let raw = store.get(DOCUMENTS_KEY).await.unwrap().unwrap();
        let entries: Vec<Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1]["garbage"], true);
        assert_eq!(index.load_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_array_value_reads_as_empty() {
        let store = MemoryStore::new();
        store
            .set(DOCUMENTS_KEY, r#"{"not": "a list"}"#.to_string())
            .await
            .unwrap();
        let index = index_with(store);

        assert!(index.load_all().await.unwrap().is_empty());

        index
            .append(&record("1", MajorHead::Personal, "Tom", &[], "2024-01-01"))
            .await
            .unwrap();
        assert_eq!(index.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_record() {
        let index = index_with(MemoryStore::new());

        let mut handles = Vec::new();
        for n in 0..20 {
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                let id = n.to_string();
                index
                    .append(&record(&id, MajorHead::Personal, "Roy", &[], "2024-01-01"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(index.load_all().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_read_failure_aborts_append() {
        let store = FailingStore::failing_reads();
        let index = DocumentIndex::new(Arc::new(store.clone()));

        let result = index
            .append(&record("1", MajorHead::Personal, "John", &[], "2024-01-01"))
            .await;

        assert!(result.is_err());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_is_returned() {
        let index = DocumentIndex::new(Arc::new(FailingStore::failing_writes()));

        let result = index
            .append(&record("1", MajorHead::Personal, "John", &[], "2024-01-01"))
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_local_ids_strictly_increase() {
        let index = index_with(MemoryStore::new());

        let ids: Vec<i64> = (0..100)
            .map(|_| index.next_local_id().parse().unwrap())
            .collect();

        assert!(ids.windows(2).all(|pair| pair[1] > pair[0]));
    }
}
