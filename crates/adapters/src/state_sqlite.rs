//! SQLite dedup store implementation

use async_trait::async_trait;
use planning_poster_domain::{DedupStore, PublishedMark, StateError};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// SQLite-backed dedup store
pub struct SqliteDedupStore {
    pool: SqlitePool,
}

impl SqliteDedupStore {
    /// Create a new SQLite dedup store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StateError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        // Single writer; one connection keeps marks strictly ordered
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

    async fn run_migrations(&self) -> Result<(), StateError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS published_marks (
                pk TEXT PRIMARY KEY NOT NULL,
                marked_at TEXT NOT NULL
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
    async fn exists(&self, pk: &str) -> Result<bool, StateError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM published_marks WHERE pk = ?")
            .bind(pk)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(count.0 > 0)
    }

    async fn mark(&self, pk: &str, marked_at: OffsetDateTime) -> Result<(), StateError> {
        let marked_at_str = marked_at
            .format(&Rfc3339)
            .map_err(|e| StateError::Serialization(e.to_string()))?;

        // Marks are never updated; a repeated mark keeps the first timestamp
        sqlx::query(
            r#"
            INSERT INTO published_marks (pk, marked_at)
            VALUES (?, ?)
            ON CONFLICT(pk) DO NOTHING
            "#,
        )
        .bind(pk)
        .bind(&marked_at_str)
        .execute(&self.pool)
        .await
        .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(())
    }

    async fn is_empty(&self) -> Result<bool, StateError> {
        let any: (i64,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM published_marks)")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(any.0 == 0)
    }

    async fn get_mark(&self, pk: &str) -> Result<Option<PublishedMark>, StateError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT pk, marked_at FROM published_marks WHERE pk = ?")
                .bind(pk)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StateError::Database(e.to_string()))?;

        match row {
            Some((pk, marked_at_str)) => {
                let marked_at = OffsetDateTime::parse(&marked_at_str, &Rfc3339)
                    .map_err(|e| StateError::Serialization(e.to_string()))?;

                Ok(Some(PublishedMark { pk, marked_at }))
            }
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64, StateError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM published_marks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StateError::Database(e.to_string()))?;

        Ok(count.0.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn test_mark_then_exists() {
        let store = SqliteDedupStore::in_memory().await.unwrap();

        assert!(store.is_empty().await.unwrap());
        assert!(!store.exists("42").await.unwrap());

        store.mark("42", OffsetDateTime::now_utc()).await.unwrap();

        assert!(store.exists("42").await.unwrap());
        assert!(!store.exists("43").await.unwrap());
        assert!(!store.is_empty().await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_is_never_updated() {
        let store = SqliteDedupStore::in_memory().await.unwrap();
        let first = OffsetDateTime::now_utc().replace_nanosecond(0).unwrap();

        store.mark("42", first).await.unwrap();
        store.mark("42", first + Duration::days(1)).await.unwrap();

        let mark = store.get_mark("42").await.unwrap().unwrap();
        assert_eq!(mark.marked_at, first);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_marks_survive_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("state.sqlite");

        let store = SqliteDedupStore::new(&db_path).await.unwrap();
        store.mark("42", OffsetDateTime::now_utc()).await.unwrap();
        store.close().await;

        let reopened = SqliteDedupStore::new(&db_path).await.unwrap();
        assert!(reopened.exists("42").await.unwrap());
        assert!(reopened.get_mark("7").await.unwrap().is_none());
    }
}
