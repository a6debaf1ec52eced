//! Integration tests for the qorcompare binary

use predicates::prelude::*;
use qorcompare::advisory::API_KEY_ENV;
use std::io::Write;
use tempfile::NamedTempFile;

const TABLE: &str = "tests/fixtures/placement_qor.json";

fn qorcompare() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("qorcompare")
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn test_text_comparison() {
    qorcompare()
        .args(["--table", TABLE, "--metric", "hpwl"])
        .args(["--base", "baseline", "--compare", "candidate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("📊 hpwl: candidate vs baseline"))
        .stdout(predicate::str::contains("Valid cases:         11 of 12 checked"))
        .stdout(predicate::str::contains("QUALITY: GOOD"));
}

#[test]
fn test_json_comparison_parses() {
    let output = qorcompare()
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["summary"]["n_valid"], 11);
    assert_eq!(parsed["summary"]["n_total_checked"], 12);
    assert_eq!(parsed["assessment"]["status"], "good");
    assert!(parsed["summary"]["points"].is_array());
    // The absent candidate value never becomes a comparison point
    let points = parsed["summary"]["points"].as_array().unwrap();
    assert!(points.iter().all(|p| p["case"] != "design_11"));
    assert!(parsed.get("advisory").is_none());
}

#[test]
fn test_all_metrics_reports_tradeoff() {
    qorcompare()
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .arg("--all-metrics")
        .assert()
        .success()
        .stdout(predicate::str::contains("📊 runtime: candidate vs baseline"))
        .stdout(predicate::str::contains("improved hpwl, regressed runtime"))
        .stdout(predicate::str::contains("QUALITY: NOTICE"));
}

#[test]
fn test_case_selection() {
    qorcompare()
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .args(["--cases", "design_00,design_01,missing_design"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid cases:         2 of 2 checked"))
        .stdout(predicate::str::contains("QUALITY: WARNING"));
}

#[test]
fn test_metric_without_valid_cases() {
    qorcompare()
        .args(["-t", TABLE, "-m", "power", "-b", "baseline", "-c", "candidate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No valid cases for metric 'power'"));
}

#[test]
fn test_correlation() {
    qorcompare()
        .args(["-t", TABLE, "--correlate", "attr:cells", "metric:runtime:baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("12 paired cases"))
        .stdout(predicate::str::contains("very strong positive"));
}

#[test]
fn test_correlation_json() {
    let output = qorcompare()
        .args(["-t", TABLE, "--format", "json"])
        .args(["--correlate", "attr:cells", "imp:hpwl:baseline:candidate"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["result"]["n"], 11);
    assert_eq!(parsed["x"], "attr:cells");
}

#[test]
fn test_invalid_variable_spec() {
    qorcompare()
        .args(["-t", TABLE, "--correlate", "cells", "metric:runtime:baseline"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid variable spec 'cells'"));
}

#[test]
fn test_advise_without_provider_uses_fallback() {
    qorcompare()
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .arg("--advise")
        .assert()
        .success()
        .stdout(predicate::str::contains("# Comparison Report: hpwl"))
        .stdout(predicate::str::contains("## Recommendations"));
}

#[test]
fn test_advise_with_unreachable_provider_falls_back() {
    let config = config_file(
        r#"
        [advisory]
        max_attempts = 1
        timeout_secs = 5

        [provider]
        type = "chat_completions"
        base_url = "http://127.0.0.1:9/v1"
        model = "local"
        "#,
    );

    let output = qorcompare()
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .args(["--advise", "root-cause", "--format", "json"])
        .arg("--config")
        .arg(config.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["advisory"]["source"]["source"], "fallback");
    assert!(parsed["advisory"]["text"]
        .as_str()
        .unwrap()
        .starts_with("# Comparison Report: hpwl"));
}

#[test]
fn test_advise_without_api_key_reports_auth_failure() {
    let config = config_file(
        r#"
        [provider]
        type = "gemini"
        "#,
    );

    let output = qorcompare()
        .env_remove(API_KEY_ENV)
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .args(["--advise", "--format", "json"])
        .arg("--config")
        .arg(config.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["advisory"]["source"]["source"], "fallback");
    assert_eq!(parsed["advisory"]["source"]["error_kind"], "auth_failure");
    assert!(String::from_utf8_lossy(&output.stderr).contains("advisory provider unavailable"));
}

#[test]
fn test_missing_algorithms() {
    qorcompare()
        .args(["-t", TABLE, "-m", "hpwl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--base and --compare are required"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = config_file("[thresholds]\nmin_sample_size = 0\n");
    qorcompare()
        .args(["-t", TABLE, "-m", "hpwl", "-b", "baseline", "-c", "candidate"])
        .arg("--config")
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_missing_table() {
    qorcompare()
        .args(["-t", "tests/fixtures/does_not_exist.json", "-m", "hpwl"])
        .args(["-b", "baseline", "-c", "candidate"])
        .assert()
        .failure();
}
