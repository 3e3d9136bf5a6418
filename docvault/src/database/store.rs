//! SQLite-backed persisted store
//!
//! One row per key in the `kv_store` table. Writes are upserts, so a `set`
//! replaces the whole value for its key.

use crate::error::Result;
use crate::storage::PersistedStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

/// Durable `PersistedStore` over a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistedStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored key: {} ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let rows = sqlx::query("DELETE FROM kv_store")
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!("Cleared persisted store ({} keys)", rows);
        Ok(())
    }
}
