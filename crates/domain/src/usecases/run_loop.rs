//! Run loop use case - orchestrates fetching, deduplicating, and publishing

use std::sync::Arc;
use time::Date;

use crate::{
    model::{ApplicationRecord, MapImage, ProcessResult, RunReport, SkipReason},
    policy::{CutoffPolicy, is_too_old},
    ports::{Clock, DedupStore, MapRenderer, Publisher, RecordSource},
    usecases::format::{FormatConfig, PostFormatter},
};

/// Configuration for the run loop
#[derive(Debug, Clone)]
pub struct RunLoopConfig {
    /// Maximum records fetched per run
    pub fetch_limit: usize,
    /// Age cutoff policy
    pub cutoff: CutoffPolicy,
    /// Dry run mode (format only; don't publish or mark)
    pub dry_run: bool,
    /// Abort the whole run on the first publish failure
    pub abort_on_publish_error: bool,
    /// Format config
    pub format_config: FormatConfig,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 200,
            cutoff: CutoffPolicy::default(),
            dry_run: true,
            abort_on_publish_error: false,
            format_config: FormatConfig::default(),
        }
    }
}

/// Run loop orchestrator
pub struct RunLoop<S, St, M, P, Cl>
where
    S: RecordSource + ?Sized,
    St: DedupStore + ?Sized,
    M: MapRenderer + ?Sized,
    P: Publisher + ?Sized,
    Cl: Clock + ?Sized,
{
    source: Arc<S>,
    store: Arc<St>,
    renderer: Arc<M>,
    publisher: Arc<P>,
    clock: Arc<Cl>,
    config: RunLoopConfig,
    formatter: PostFormatter,
}

impl<S, St, M, P, Cl> RunLoop<S, St, M, P, Cl>
where
    S: RecordSource + ?Sized,
    St: DedupStore + ?Sized,
    M: MapRenderer + ?Sized,
    P: Publisher + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        source: Arc<S>,
        store: Arc<St>,
        renderer: Arc<M>,
        publisher: Arc<P>,
        clock: Arc<Cl>,
        config: RunLoopConfig,
    ) -> Self {
        let formatter = PostFormatter::new(config.format_config.clone());
        Self {
            source,
            store,
            renderer,
            publisher,
            clock,
            config,
            formatter,
        }
    }

    /// Check publisher credentials. Failure is logged, never fatal.
    pub async fn verify_publisher(&self) -> bool {
        match self.publisher.verify_credentials().await {
            Ok(()) => {
                tracing::info!(platform = self.publisher.platform(), "Authentication OK");
                true
            }
            Err(e) => {
                tracing::error!(
                    platform = self.publisher.platform(),
                    error = %e,
                    "Error during authentication"
                );
                false
            }
        }
    }

    /// Run a single pass over the newest page of records
    pub async fn run_once(&self) -> Result<RunReport, RunLoopError> {
        let cutoff = self.resolve_cutoff().await?;

        tracing::info!(
            limit = self.config.fetch_limit,
            cutoff = ?cutoff,
            dry_run = self.config.dry_run,
            "Fetching records"
        );

        let records = self
            .source
            .fetch(self.config.fetch_limit)
            .await
            .map_err(|e| RunLoopError::Source(e.to_string()))?;

        tracing::info!(count = records.len(), "Fetched records");

        let mut report = RunReport::default();
        for record in records {
            let result = self.process_record(&record, cutoff).await?;
            report.results.push((record.pk, result));
        }

        tracing::info!(
            published = report.published(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Run complete"
        );

        Ok(report)
    }

    /// Release the store once no further runs will happen
    pub async fn shutdown(&self) {
        self.store.close().await;
    }

    async fn resolve_cutoff(&self) -> Result<Option<Date>, RunLoopError> {
        let store_is_empty = if self.config.cutoff.needs_store_state() {
            self.store.is_empty().await.map_err(RunLoopError::state)?
        } else {
            false
        };

        Ok(self
            .config
            .cutoff
            .resolve(self.clock.today(), store_is_empty))
    }

    /// Reach a disposition for one record
    async fn process_record(
        &self,
        record: &ApplicationRecord,
        cutoff: Option<Date>,
    ) -> Result<ProcessResult, RunLoopError> {
        if self
            .store
            .exists(&record.pk)
            .await
            .map_err(RunLoopError::state)?
        {
            return Ok(skipped(&record.pk, SkipReason::AlreadyPublished));
        }

        if is_too_old(record.registered_date, cutoff) {
            if !self.config.dry_run {
                self.mark(&record.pk).await?;
            }
            return Ok(skipped(&record.pk, SkipReason::TooOld));
        }

        let post = self.formatter.format(record);

        if self.config.dry_run {
            tracing::info!(
                pk = %record.pk,
                text = %post.text,
                has_location = record.location.is_some(),
                "[DRY RUN] Would publish"
            );
            return Ok(ProcessResult::Skipped {
                reason: SkipReason::DryRun,
            });
        }

        let image = match self.render_map(record).await {
            Ok(image) => image,
            Err(error) => {
                tracing::error!(pk = %record.pk, error = %error, "Failed to render map");
                return Ok(ProcessResult::Failed { error });
            }
        };

        let published = self.publisher.publish(&post, image.as_ref()).await;
        // Removes the temporary image whether or not publishing succeeded
        drop(image);

        match published {
            Ok(result) => {
                self.mark(&record.pk).await?;
                tracing::info!(
                    pk = %record.pk,
                    post_id = %result.id,
                    chars = post.text.chars().count(),
                    "Published: \"{}\"",
                    post.text
                );
                Ok(ProcessResult::Published {
                    post_id: result.id,
                    url: result.url,
                    text: post.text,
                })
            }
            Err(e) => {
                tracing::error!(
                    pk = %record.pk,
                    platform = self.publisher.platform(),
                    error = %e,
                    "Failed to publish"
                );
                if self.config.abort_on_publish_error {
                    return Err(RunLoopError::Publish(e.to_string()));
                }
                Ok(ProcessResult::Failed {
                    error: format!("Publish failed: {}", e),
                })
            }
        }
    }

    async fn render_map(&self, record: &ApplicationRecord) -> Result<Option<MapImage>, String> {
        let Some(coordinates) = record.location else {
            return Ok(None);
        };
        if !self.renderer.is_enabled() {
            return Ok(None);
        }

        self.renderer
            .render(coordinates)
            .await
            .map(Some)
            .map_err(|e| format!("Map render failed: {}", e))
    }

    async fn mark(&self, pk: &str) -> Result<(), RunLoopError> {
        self.store
            .mark(pk, self.clock.now())
            .await
            .map_err(RunLoopError::state)
    }
}

fn skipped(pk: &str, reason: SkipReason) -> ProcessResult {
    tracing::info!(pk = %pk, "Skipping {}: {}", pk, reason);
    ProcessResult::Skipped { reason }
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum RunLoopError {
    #[error("Record source error: {0}")]
    Source(String),
    #[error("State error: {0}")]
    State(String),
    #[error("Publish error: {0}")]
    Publish(String),
}

impl RunLoopError {
    fn state(error: crate::ports::StateError) -> Self {
        RunLoopError::State(error.to_string())
    }
}
