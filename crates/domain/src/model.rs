//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::path::Path;
use tempfile::TempPath;
use time::{Date, OffsetDateTime};

/// Geographic coordinates of an application site
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A planning application record fetched from the open-data feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Provider-assigned primary key
    pub pk: String,
    /// Application type (e.g. "Householder")
    pub application_type: String,
    /// Applicant name, when the provider publishes one
    pub applicant_name: Option<String>,
    /// Site address
    pub development_address: String,
    /// Date the application was registered
    pub registered_date: Date,
    /// Canonical link to the full application
    pub url: String,
    /// Site location, when the provider geocoded it
    pub location: Option<Coordinates>,
}

/// Permanent record that a final disposition was reached for a pk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedMark {
    pub pk: String,
    #[serde(with = "time::serde::rfc3339")]
    pub marked_at: OffsetDateTime,
}

/// Post text and metadata ready for publishing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    /// Record the post was built from
    pub source_pk: String,
    /// The text content
    pub text: String,
    /// Coordinates to geotag the post with
    pub coordinates: Option<Coordinates>,
}

/// A rendered map image in transient storage.
///
/// The backing file is removed when the value is dropped.
#[derive(Debug)]
pub struct MapImage {
    path: TempPath,
}

impl MapImage {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Why a record was skipped without publishing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A mark already exists for the pk
    AlreadyPublished,
    /// Registered before the active cutoff date; marked without publishing
    TooOld,
    /// Dry run: formatted but neither published nor marked
    DryRun,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyPublished => f.write_str("Already published"),
            SkipReason::TooOld => f.write_str("Too old"),
            SkipReason::DryRun => f.write_str("Dry run"),
        }
    }
}

/// Processing result for a single record
#[derive(Debug)]
pub enum ProcessResult {
    /// Record was published and marked
    Published {
        post_id: String,
        url: Option<String>,
        text: String,
    },
    /// Record was skipped
    Skipped { reason: SkipReason },
    /// Rendering or publishing failed; the record stays unmarked
    Failed { error: String },
}

/// Outcome of one run over a fetched batch
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<(String, ProcessResult)>,
}

impl RunReport {
    pub fn published(&self) -> usize {
        self.count(|r| matches!(r, ProcessResult::Published { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, ProcessResult::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|r| matches!(r, ProcessResult::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ProcessResult) -> bool) -> usize {
        self.results.iter().filter(|(_, r)| pred(r)).count()
    }
}
