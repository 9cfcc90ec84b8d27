//! JSONL outbox publisher.
//!
//! Posts are appended to a file for later review instead of going to a
//! platform. Attached maps are copied into a sibling `<outbox>.maps/`
//! directory, since the rendered image itself is removed after publishing.

use async_trait::async_trait;
use planning_poster_domain::{Coordinates, MapImage, Post, PublishError, PublishResult, Publisher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Append-only JSONL file plus a directory for map copies
#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    maps_dir: PathBuf,
    file: Arc<Mutex<File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut maps_dir = path.clone().into_os_string();
        maps_dir.push(".maps");

        Ok(Self {
            path,
            maps_dir: PathBuf::from(maps_dir),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn keep_map(&self, id: &str, image: &MapImage) -> Result<PathBuf, OutboxError> {
        fs::create_dir_all(&self.maps_dir).await?;
        let target = self.maps_dir.join(format!("{}.png", id));
        fs::copy(image.path(), &target).await?;
        Ok(target)
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: &'a str,
    source_pk: &'a str,
    queued_at: String,
    text: &'a str,
    coordinates: Option<Coordinates>,
    map: Option<&'a Path>,
}

/// Publisher that queues posts in an outbox file
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter) -> Self {
        Self { writer }
    }

    async fn queue(&self, post: &Post, image: Option<&MapImage>) -> Result<String, OutboxError> {
        let id = Uuid::new_v4().to_string();

        let map = match image {
            Some(image) => Some(self.writer.keep_map(&id, image).await?),
            None => None,
        };

        let entry = OutboxEntry {
            id: &id,
            source_pk: &post.source_pk,
            queued_at: OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)?,
            text: &post.text,
            coordinates: post.coordinates,
            map: map.as_deref(),
        };
        self.writer.append(&entry).await?;

        tracing::debug!(id = %id, pk = %post.source_pk, "Queued post in outbox");
        Ok(id)
    }
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn verify_credentials(&self) -> Result<(), PublishError> {
        Ok(())
    }

    async fn publish(
        &self,
        post: &Post,
        image: Option<&MapImage>,
    ) -> Result<PublishResult, PublishError> {
        let id = self.queue(post, image).await.map_err(|e| match e {
            OutboxError::Io(io) if image.is_some() => {
                PublishError::Media(format!("Outbox map copy failed: {}", io))
            }
            other => PublishError::Api(format!("Outbox write failed: {}", other)),
        })?;

        Ok(PublishResult { id, url: None })
    }

    fn platform(&self) -> &'static str {
        "outbox"
    }
}
