//! SQLite-backed store
//!
//! Each key is one row of the `kv_store` table holding the JSON text.
//! `updated_at` is stamped from the store's clock.

use super::Store;
use crate::context::{Clock, SystemClock};
use crate::database::create_pool;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Wrap a pool whose schema is already initialized
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Like [`SqliteStore::new`], stamping rows from `clock`
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    fn now(&self) -> Result<DateTime<Utc>> {
        let ms = self.clock.now_ms();
        DateTime::<Utc>::from_timestamp_millis(ms)
            .ok_or_else(|| AppError::Generic(format!("Clock value out of range: {}", ms)))
    }

    /// Open (creating if needed) the database file and run migrations
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = create_pool(db_path).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn write_raw(&self, key: &str, value: String) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(self.now()?)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Wrote key '{}' ({} bytes)", key, value.len());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Removed key '{}'", key);
        Ok(())
    }
}
