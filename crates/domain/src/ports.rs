//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::{Date, OffsetDateTime};

use crate::model::{ApplicationRecord, Coordinates, MapImage, Post, PublishedMark};

/// Error type for record source operations (the feed is unavailable)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Port for fetching application records from the open-data feed
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch up to `limit` records, newest registration first
    async fn fetch(&self, limit: usize) -> Result<Vec<ApplicationRecord>, SourceError>;
}

/// Error type for dedup store operations (storage is unavailable)
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for the persistent set of already-disposed record keys
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Check whether a mark exists for the pk
    async fn exists(&self, pk: &str) -> Result<bool, StateError>;

    /// Record a final disposition for the pk; durable once this returns
    async fn mark(&self, pk: &str, marked_at: OffsetDateTime) -> Result<(), StateError>;

    /// Check whether no marks exist at all
    async fn is_empty(&self) -> Result<bool, StateError>;

    /// Get the mark for a pk, if any
    async fn get_mark(&self, pk: &str) -> Result<Option<PublishedMark>, StateError>;

    /// Number of marks stored
    async fn count(&self) -> Result<u64, StateError>;

    /// Release the underlying storage connection
    async fn close(&self) {}
}

/// Error type for map rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Tile fetch failed for {url}: {message}")]
    Tile { url: String, message: String },
    #[error("Image error: {0}")]
    Image(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Port for rendering a static map around a location
#[async_trait]
pub trait MapRenderer: Send + Sync {
    /// Render a map with a marker at the coordinates into a temporary file
    async fn render(&self, coordinates: Coordinates) -> Result<MapImage, RenderError>;

    /// Check if this renderer is enabled
    fn is_enabled(&self) -> bool;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Media upload failed: {0}")]
    Media(String),
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

/// Port for publishing posts to a social platform
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Check the configured credentials against the platform
    async fn verify_credentials(&self) -> Result<(), PublishError>;

    /// Publish a post with an optional image attachment
    async fn publish(
        &self,
        post: &Post,
        image: Option<&MapImage>,
    ) -> Result<PublishResult, PublishError>;

    /// Get the platform name (e.g., "x", "outbox")
    fn platform(&self) -> &'static str;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;

    /// Get the current calendar date
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
