use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const RECORD: &str = r#"{
    "pk": "584312",
    "application_type": "Householder",
    "applicant_name": "Ms A Example",
    "development_address": "Flat 3, 125 Somewhere Really Long Road, London",
    "registered_date": "2021-03-04T00:00:00.000",
    "full_application": {"url": "http://camdocs.camden.gov.uk/584312"},
    "location": {"latitude": "51.5432", "longitude": "-0.1456"}
}"#;

fn write_record(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("record.json");
    fs::write(&path, RECORD).expect("write record");
    path
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("planning-poster");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("dry_run = true"));
    assert!(content.contains("policy = \"yesterday_if_empty\""));

    let mut cmd = cargo_bin_cmd!("planning-poster");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn format_prints_post_text() {
    let dir = TempDir::new().expect("temp dir");
    let record_path = write_record(&dir);

    let mut cmd = cargo_bin_cmd!("planning-poster");
    cmd.current_dir(dir.path())
        .args(["format", "--file"])
        .arg(&record_path)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "New Householder planning application from Ms A Example at Flat 3, 125 Somewhere Really Long…. Registered on 04 March 2021.",
        ))
        .stdout(predicate::str::contains("http://camdocs.camden.gov.uk/584312"));
}

#[test]
fn format_reads_stdin_and_outputs_json() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("planning-poster");
    let output = cmd
        .current_dir(dir.path())
        .args(["format", "--json"])
        .write_stdin(RECORD)
        .output()
        .expect("run format");

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["source_pk"], "584312");
    assert!((value["coordinates"]["latitude"].as_f64().unwrap() - 51.5432).abs() < 1e-9);
}

#[test]
fn format_rejects_malformed_record() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("planning-poster");
    cmd.current_dir(dir.path())
        .args(["format"])
        .write_stdin(r#"{"pk": "1"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse feed record"));
}

#[test]
fn state_mark_check_and_count() {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join("state.sqlite");

    let state = |args: &[&str]| {
        let mut cmd = cargo_bin_cmd!("planning-poster");
        cmd.current_dir(dir.path())
            .arg("state")
            .args(args)
            .arg("--db")
            .arg(&db_path)
            .assert()
            .success()
    };

    state(&["count"]).stdout(predicate::str::diff("0\n"));
    state(&["check", "42"]).stdout(predicate::str::contains("42: not handled"));
    state(&["mark", "42"]).stdout(predicate::str::contains("42: marked"));
    state(&["mark", "42"]).stdout(predicate::str::contains("42: already handled"));
    state(&["check", "42"]).stdout(predicate::str::contains("42: handled at"));
    state(&["count"]).stdout(predicate::str::diff("1\n"));

    assert!(db_path.exists());
}

#[test]
fn run_without_publisher_fails() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("planning-poster");
    cmd.current_dir(dir.path())
        .env("PLANNING_POSTER__GENERAL__DRY_RUN", "false")
        .env("PLANNING_POSTER__X__ENABLED", "false")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No publisher configured"));
}

#[test]
fn doctor_reports_invalid_cutoff() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("planning-poster");
    let output = cmd
        .current_dir(dir.path())
        .env("PLANNING_POSTER__CUTOFF__POLICY", "fixed")
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    assert!(!output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["cutoff"]["status"], "error");
    assert_eq!(value["overall"], "error");
}

#[test]
fn config_show_applies_env_overrides() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("planning-poster");
    cmd.current_dir(dir.path())
        .env("PLANNING_POSTER__SOURCE__LIMIT", "25")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("limit = 25"))
        .stdout(predicate::str::contains("[map]"));
}
