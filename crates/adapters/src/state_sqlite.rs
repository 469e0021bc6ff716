//! SQLite delivery ledger

use async_trait::async_trait;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use toot_mirror_domain::{DedupKey, DedupRecord, DedupStore, StateError};

/// SQLite-backed ledger, one database file per target account
pub struct SqliteDedupStore {
    pool: SqlitePool,
}

impl SqliteDedupStore {
    /// Open (or create) the ledger database at `db_path`
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StateError::Database(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        // Single writer, single reader
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&db_url)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StateError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Ledger file for a target account inside `state_dir`
    pub fn path_for(state_dir: impl AsRef<Path>, account: &str) -> PathBuf {
        let file_name: String = format!("toot-mirror-{}.sqlite", account)
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        state_dir.as_ref().join(file_name)
    }

    async fn run_migrations(&self) -> Result<(), StateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS delivered_entries (
                entry_id TEXT NOT NULL,
                post_id TEXT NOT NULL,
                source TEXT NOT NULL,
                account TEXT NOT NULL,
                instance TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                UNIQUE(entry_id, source, account, instance)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    async fn is_processed(&self, key: &DedupKey) -> Result<bool, StateError> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM delivered_entries
            WHERE entry_id = ? AND source = ? AND account = ? AND instance = ?
            "#,
        )
        .bind(&key.entry_id)
        .bind(&key.source)
        .bind(&key.account)
        .bind(&key.instance)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(count.0 > 0)
    }

    async fn record(&self, record: &DedupRecord) -> Result<bool, StateError> {
        let recorded_at_str = record
            .recorded_at
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO delivered_entries
            (entry_id, post_id, source, account, instance, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(entry_id, source, account, instance) DO NOTHING
            "#,
        )
        .bind(&record.key.entry_id)
        .bind(&record.post_id)
        .bind(&record.key.source)
        .bind(&record.key.account)
        .bind(&record.key.instance)
        .bind(&recorded_at_str)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_record(&self, key: &DedupKey) -> Result<Option<DedupRecord>, StateError> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT post_id, recorded_at FROM delivered_entries
            WHERE entry_id = ? AND source = ? AND account = ? AND instance = ?
            "#,
        )
        .bind(&key.entry_id)
        .bind(&key.source)
        .bind(&key.account)
        .bind(&key.instance)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        match row {
            Some((post_id, recorded_at_str)) => {
                let recorded_at = OffsetDateTime::parse(
                    &recorded_at_str,
                    &time::format_description::well_known::Rfc3339,
                )
                .map_err(|e| StateError::Serialization(e.to_string()))?;

                Ok(Some(DedupRecord {
                    key: key.clone(),
                    post_id,
                    recorded_at,
                }))
            }
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64, StateError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delivered_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(count.0.max(0) as u64)
    }
}
