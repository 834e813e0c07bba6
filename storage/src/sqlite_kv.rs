//! SQLite-backed [`KvStore`]: a single `kv` table keyed by TEXT primary key.
//!
//! Prefix scans are range queries on the primary key, so listing rules or one source's stats
//! does not scan the whole table.

use crate::error::StorageError;
use crate::kv::{prefix_upper_bound, KvStore};
use crate::sqlite_pool::SqlitePoolManager;
use async_trait::async_trait;
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqliteKvStore {
    pool_manager: SqlitePoolManager,
}

impl SqliteKvStore {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let store = Self { pool_manager };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating kv table if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO kv (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool_manager.pool())
        .await?;
        debug!(key = %key, "kv put");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StorageError> {
        let pool = self.pool_manager.pool();
        let rows: Vec<(String, String)> = match prefix_upper_bound(prefix) {
            Some(upper) => {
                sqlx::query_as("SELECT key, value FROM kv WHERE key >= ? AND key < ? ORDER BY key")
                    .bind(prefix)
                    .bind(upper)
                    .fetch_all(pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT key, value FROM kv ORDER BY key")
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, StorageError> {
        let pool = self.pool_manager.pool();
        let result = match prefix_upper_bound(prefix) {
            Some(upper) => {
                sqlx::query("DELETE FROM kv WHERE key >= ? AND key < ?")
                    .bind(prefix)
                    .bind(upper)
                    .execute(pool)
                    .await?
            }
            None => sqlx::query("DELETE FROM kv").execute(pool).await?,
        };
        info!(prefix = %prefix, deleted = result.rows_affected(), "kv prefix deleted");
        Ok(result.rows_affected())
    }
}
