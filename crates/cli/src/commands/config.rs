//! Config command - write an example file or show the effective settings

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(&path, force),
        ConfigCommands::Show => show_config(config_path.as_deref()),
    }
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // create_new refuses to clobber an existing file unless forced
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .create(force)
        .create_new(!force)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => anyhow::anyhow!(
                "Config file already exists: {}. Use --force to overwrite.",
                path.display()
            ),
            _ => anyhow::Error::new(e)
                .context(format!("Failed to open config file: {}", path.display())),
        })?;

    file.write_all(AppConfig::example_toml().as_bytes())
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    tracing::info!(path = %path.display(), "Wrote example configuration");

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Pick the dataset and cutoff policy");
    println!("  2. Export X_USER_TOKEN and set [x] enabled = true, or use --outbox");
    println!("  3. Run 'planning-poster doctor'");
    println!("  4. Preview with 'planning-poster run --dry-run'");

    Ok(())
}

fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = AppConfig::load(config_path)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
