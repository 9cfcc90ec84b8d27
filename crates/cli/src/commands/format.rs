//! Format command - render one feed record as a post without publishing

use anyhow::{Context, Result};
use planning_poster_adapters::source::parse_record;
use planning_poster_domain::usecases::PostFormatter;
use std::io::Read;
use std::path::PathBuf;

use crate::args::FormatArgs;
use crate::config::AppConfig;

pub async fn execute(args: FormatArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let input = read_input(args.file.as_ref())?;
    let record = parse_record(&input).context("Failed to parse feed record")?;

    let formatter = PostFormatter::new(config.format.to_format_config());
    let post = formatter.format(&record);

    tracing::debug!(pk = %post.source_pk, chars = post.text.chars().count(), "Formatted record");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        println!("{}", post.text);
    }

    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read record file: {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read record from stdin")?;
            Ok(buffer)
        }
    }
}
