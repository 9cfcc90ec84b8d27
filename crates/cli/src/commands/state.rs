//! State command - inspect and edit the published-records store

use anyhow::{Context, Result};
use planning_poster_adapters::state::SqliteDedupStore;
use planning_poster_domain::{Clock, DedupStore, SystemClock};
use std::path::PathBuf;

use crate::args::{StateArgs, StateCommands};
use crate::config::AppConfig;

pub async fn execute(args: StateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let db_path = match args.db {
        Some(path) => path,
        None => AppConfig::load(config_path.as_deref())?.general.state_db_path,
    };

    let store = SqliteDedupStore::new(&db_path)
        .await
        .with_context(|| format!("Failed to open state database: {}", db_path.display()))?;

    let result = run_command(&store, args.command, &db_path).await;
    store.close().await;
    result
}

async fn run_command(
    store: &SqliteDedupStore,
    command: StateCommands,
    db_path: &std::path::Path,
) -> Result<()> {
    match command {
        StateCommands::Init => {
            println!("State database ready: {}", db_path.display());
        }
        StateCommands::Check { pk } => match store.get_mark(&pk).await? {
            Some(mark) => println!("{}: handled at {}", mark.pk, format_timestamp(mark.marked_at)?),
            None => println!("{}: not handled", pk),
        },
        StateCommands::Mark { pk } => {
            if store.exists(&pk).await? {
                println!("{}: already handled", pk);
            } else {
                store.mark(&pk, SystemClock.now()).await?;
                tracing::info!(pk = %pk, "Marked record as handled");
                println!("{}: marked", pk);
            }
        }
        StateCommands::Count => {
            println!("{}", store.count().await?);
        }
    }

    Ok(())
}

fn format_timestamp(value: time::OffsetDateTime) -> Result<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .context("Failed to format timestamp")
}
