//! planning-poster CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;

use args::{Cli, Commands, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_level.as_deref().unwrap_or("info"), cli.log_format)?;

    let config_path = cli.config;
    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config_path).await,
        Commands::Format(args) => commands::format::execute(args, config_path).await,
        Commands::State(args) => commands::state::execute(args, config_path).await,
        Commands::Config(args) => commands::config::execute(args, config_path).await,
        Commands::Doctor(args) => commands::doctor::execute(args, config_path).await,
    }
}

/// Logs go to stderr; stdout carries command output
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
