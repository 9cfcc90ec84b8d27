//! In-memory dedup store for tests and throwaway runs

use async_trait::async_trait;
use planning_poster_domain::{DedupStore, PublishedMark, StateError};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;

/// In-memory dedup store implementation
pub struct InMemoryDedupStore {
    marks: RwLock<HashMap<String, OffsetDateTime>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self {
            marks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDedupStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn exists(&self, pk: &str) -> Result<bool, StateError> {
        let marks = self
            .marks
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(marks.contains_key(pk))
    }

    async fn mark(&self, pk: &str, marked_at: OffsetDateTime) -> Result<(), StateError> {
        let mut marks = self
            .marks
            .write()
            .map_err(|e| StateError::Database(e.to_string()))?;
        marks.entry(pk.to_string()).or_insert(marked_at);
        Ok(())
    }

    async fn is_empty(&self) -> Result<bool, StateError> {
        let marks = self
            .marks
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(marks.is_empty())
    }

    async fn get_mark(&self, pk: &str) -> Result<Option<PublishedMark>, StateError> {
        let marks = self
            .marks
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(marks.get(pk).map(|marked_at| PublishedMark {
            pk: pk.to_string(),
            marked_at: *marked_at,
        }))
    }

    async fn count(&self) -> Result<u64, StateError> {
        let marks = self
            .marks
            .read()
            .map_err(|e| StateError::Database(e.to_string()))?;
        Ok(marks.len() as u64)
    }
}
