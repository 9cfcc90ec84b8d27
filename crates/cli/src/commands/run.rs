//! Run command - fetch, deduplicate, and publish planning applications

use anyhow::{Context, Result, bail};
use planning_poster_adapters::{
    map::{DisabledMapRenderer, StaticMapRenderer},
    outbox::{OutboxPublisher, OutboxWriter},
    source::SocrataSource,
    state::SqliteDedupStore,
    x::XPublisher,
};
use planning_poster_domain::{
    MapRenderer, ProcessResult, Publisher, RecordSource, SystemClock,
    usecases::{RunLoop, RunLoopConfig},
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::args::RunArgs;
use crate::commands::{load_secret, optional_secret};
use crate::config::AppConfig;

type AppRunLoop =
    RunLoop<dyn RecordSource, SqliteDedupStore, dyn MapRenderer, dyn Publisher, SystemClock>;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let mut dry_run = args.dry_run || config.general.dry_run;
    if args.outbox.is_some() && dry_run {
        tracing::info!("--outbox overrides dry-run");
        dry_run = false;
    }

    tracing::info!(
        dry_run = dry_run,
        watch = args.watch,
        outbox = ?args.outbox,
        dataset = %config.source.dataset,
        "Starting planning-poster run"
    );

    // Build dependencies
    let store = Arc::new(
        SqliteDedupStore::new(&config.general.state_db_path)
            .await
            .context("Failed to initialize SQLite state store")?,
    );

    let source: Arc<dyn RecordSource> = Arc::new(build_source(&config)?);
    let renderer = build_renderer(&config, dry_run)?;
    let publisher = build_publisher(&config, dry_run, args.outbox).await?;
    let clock = Arc::new(SystemClock);

    let loop_config = RunLoopConfig {
        fetch_limit: config.source.limit,
        cutoff: config.cutoff.to_policy()?,
        dry_run,
        abort_on_publish_error: config.general.abort_on_publish_error,
        format_config: config.format.to_format_config(),
    };

    let run_loop: AppRunLoop = RunLoop::new(source, store, renderer, publisher, clock, loop_config);

    if !dry_run {
        run_loop.verify_publisher().await;
    }

    let outcome = if args.watch {
        watch(&run_loop, config.general.poll_interval_secs).await;
        Ok(())
    } else {
        run_single(&run_loop).await
    };

    run_loop.shutdown().await;
    outcome?;

    tracing::info!("planning-poster run completed");
    Ok(())
}

async fn run_single(run_loop: &AppRunLoop) -> Result<()> {
    let report = run_loop.run_once().await.context("Run failed")?;

    for (pk, result) in &report.results {
        match result {
            ProcessResult::Published { post_id, url, .. } => {
                tracing::info!(pk = %pk, post_id = %post_id, url = ?url, "Published");
            }
            ProcessResult::Skipped { reason } => {
                tracing::debug!(pk = %pk, reason = %reason, "Skipped");
            }
            ProcessResult::Failed { error } => {
                tracing::error!(pk = %pk, error = %error, "Failed");
            }
        }
    }

    Ok(())
}

async fn watch(run_loop: &AppRunLoop, poll_interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(poll_interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match run_loop.run_once().await {
                    Ok(report) => {
                        if !report.results.is_empty() {
                            tracing::info!(processed = report.results.len(), "Run cycle complete");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Run cycle failed");
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }
}

fn build_source(config: &AppConfig) -> Result<SocrataSource> {
    let app_token = optional_secret(&config.source.app_token_env);
    if app_token.is_none() {
        tracing::debug!("No Socrata app token set; requests are anonymous");
    }

    SocrataSource::new(
        config.source.base_url.clone(),
        config.source.dataset.clone(),
        config.source.order_by.clone(),
        app_token,
    )
    .context("Failed to initialize Socrata source")
}

fn build_renderer(config: &AppConfig, dry_run: bool) -> Result<Arc<dyn MapRenderer>> {
    if dry_run || !config.map.enabled {
        return Ok(Arc::new(DisabledMapRenderer));
    }

    let renderer = StaticMapRenderer::new(config.map.to_settings())
        .context("Failed to initialize map renderer")?;
    Ok(Arc::new(renderer))
}

async fn build_publisher(
    config: &AppConfig,
    dry_run: bool,
    outbox: Option<PathBuf>,
) -> Result<Arc<dyn Publisher>> {
    if let Some(path) = outbox {
        let writer = OutboxWriter::new(path)
            .await
            .context("Failed to initialize outbox writer")?;
        tracing::info!(outbox = %writer.path().display(), "Writing posts to outbox");
        return Ok(Arc::new(OutboxPublisher::new(writer)));
    }

    if dry_run {
        return Ok(Arc::new(XPublisher::disabled()));
    }

    if !config.x.enabled {
        bail!("No publisher configured: enable [x] or pass --outbox");
    }

    let user_token: SecretString = load_secret(&config.x.user_token_env, "x")?;
    let publisher = XPublisher::with_base_url(user_token, config.x.base_url.clone())
        .context("Failed to initialize X publisher")?;
    Ok(Arc::new(publisher))
}
