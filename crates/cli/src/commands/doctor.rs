//! Doctor command - validate configuration and show status

use anyhow::Result;
use planning_poster_adapters::{map::MAX_ZOOM, state::SqliteDedupStore};
use planning_poster_domain::DedupStore;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    state: CheckResult,
    source: CheckResult,
    cutoff: CheckResult,
    map: CheckResult,
    x: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self::with_status("ok", message)
    }

    fn warn(message: impl Into<String>) -> Self {
        Self::with_status("warn", message)
    }

    fn error(message: impl Into<String>) -> Self {
        Self::with_status("error", message)
    }

    fn with_status(status: &str, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        state: CheckResult::error("Not checked"),
        source: CheckResult::error("Not checked"),
        cutoff: CheckResult::error("Not checked"),
        map: CheckResult::error("Not checked"),
        x: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.state = check_state(&config.general.state_db_path).await;
        report.source = check_source(config);
        report.cutoff = check_cutoff(config);
        report.map = check_map(config);
        report.x = check_x(config);
    }

    let checks = [
        &report.config,
        &report.state,
        &report.source,
        &report.cutoff,
        &report.map,
        &report.x,
    ];

    report.overall = if checks.iter().any(|c| c.is_error()) {
        "error".to_string()
    } else if checks.iter().all(|c| c.is_ok()) {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_state(db_path: &Path) -> CheckResult {
    if !db_path.exists() {
        return CheckResult::warn(format!(
            "State database not created yet: {} (first run skips records older than yesterday)",
            db_path.display()
        ));
    }

    let store = match SqliteDedupStore::new(db_path).await {
        Ok(store) => store,
        Err(e) => return CheckResult::error(format!("Failed to open state database: {}", e)),
    };

    let result = match store.count().await {
        Ok(count) => CheckResult::ok(format!("{} records handled", count)).with_details(
            serde_json::json!({
                "path": db_path.display().to_string(),
                "count": count,
            }),
        ),
        Err(e) => CheckResult::error(format!("Failed to read state database: {}", e)),
    };

    store.close().await;
    result
}

fn check_source(config: &AppConfig) -> CheckResult {
    let source = &config.source;

    if source.base_url.trim().is_empty() || source.dataset.trim().is_empty() {
        return CheckResult::error("Source base_url and dataset must be set");
    }

    if source.limit == 0 {
        return CheckResult::error("Source limit must be greater than zero");
    }

    let token_set = env_var_set(&source.app_token_env);
    let message = format!(
        "Dataset: {} at {}, limit {}",
        source.dataset, source.base_url, source.limit
    );

    if token_set {
        CheckResult::ok(format!("{}, app token: {} (set)", message, source.app_token_env))
    } else {
        CheckResult::warn(format!(
            "{}, app token: {} (not set, requests are throttled)",
            message, source.app_token_env
        ))
    }
}

fn check_cutoff(config: &AppConfig) -> CheckResult {
    match config.cutoff.to_policy() {
        Ok(policy) => CheckResult::ok(format!("Policy: {:?}", policy)),
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn check_map(config: &AppConfig) -> CheckResult {
    let map = &config.map;

    if !map.enabled {
        return CheckResult::ok("Map rendering disabled");
    }

    if map.width == 0 || map.height == 0 {
        return CheckResult::error("Map width and height must be greater than zero");
    }

    if map.zoom > MAX_ZOOM {
        return CheckResult::error(format!(
            "Map zoom {} exceeds the maximum of {}",
            map.zoom, MAX_ZOOM
        ));
    }

    if let Some(icon) = &map.marker_icon {
        if !icon.is_file() {
            return CheckResult::error(format!("Marker icon not found: {}", icon.display()));
        }
    }

    CheckResult::ok(format!(
        "{}x{} at zoom {}, tiles: {}",
        map.width, map.height, map.zoom, map.tile_url_template
    ))
}

fn check_x(config: &AppConfig) -> CheckResult {
    if !config.x.enabled {
        return CheckResult::warn("X disabled (use --outbox or dry-run)");
    }

    let env_var = &config.x.user_token_env;

    if env_var.is_empty() {
        return CheckResult::error("No user token env var configured");
    }

    if env_var_set(env_var) {
        CheckResult::ok(format!("User token: {} (set)", env_var))
    } else {
        CheckResult::error(format!("User token: {} (not set)", env_var))
    }
}

fn env_var_set(name: &str) -> bool {
    !name.is_empty() && matches!(std::env::var(name), Ok(val) if !val.trim().is_empty())
}

fn print_report(report: &DoctorReport) {
    println!("planning-poster Doctor Report");
    println!("=============================");
    println!();

    print_check("Config", &report.config);
    print_check("State", &report.state);
    print_check("Source", &report.source);
    print_check("Cutoff", &report.cutoff);
    print_check("Map", &report.map);
    print_check("X", &report.x);

    println!();
    println!(
        "{} Overall: {}",
        symbol(&report.overall),
        report.overall.to_uppercase()
    );

    if report.overall != "error" {
        println!();
        println!("Ready to run! Try: planning-poster run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("{} {}: {}", symbol(&result.status), name, result.message);
}

fn symbol(status: &str) -> &'static str {
    match status {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    }
}
