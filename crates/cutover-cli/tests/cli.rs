//! End-to-end tests for the `cutover` binary.
//!
//! Each test gets a private state directory through a generated config
//! file. No supervisor or proxy is contacted except where a failure is
//! being provoked.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("cutover.toml");
    let body = format!(
        r#"
[state]
dir = "{}"

{}
"#,
        dir.path().join("state").display(),
        extra
    );
    std::fs::write(&path, body).unwrap();
    path
}

fn cutover(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cutover").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("CUTOVER_CONFIG")
        .arg("--config")
        .arg(config);
    cmd
}

// ============================================================================
// init / status
// ============================================================================

#[test]
fn init_then_status_json() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    cutover(&config)
        .args(["init", "api", "--version", "v1.0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("provisioned"));

    let output = cutover(&config)
        .args(["status", "api", "--output", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["service"], "api");
    assert_eq!(status["active_env"], "blue");
    assert_eq!(status["environments"]["green"]["port"], 3002);
    assert_eq!(status["environments"]["blue"]["version"], "v1.0.0");
    assert_eq!(status["history"].as_array().unwrap().len(), 0);
}

#[test]
fn init_twice_leaves_record_alone() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    cutover(&config)
        .args(["init", "api", "--blue-port", "4001", "--green-port", "4002"])
        .assert()
        .success();

    cutover(&config)
        .args(["init", "api", "--blue-port", "5001", "--green-port", "5002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already provisioned"));

    cutover(&config)
        .args(["status", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4001"))
        .stdout(predicate::str::contains("5001").not());
}

#[test]
fn status_of_unknown_service_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    cutover(&config)
        .args(["status", "ghost", "-o", "json"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("state_unavailable"));
}

#[test]
fn invalid_service_name_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "");

    cutover(&config)
        .args(["status", "../etc", "-o", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid_argument"));
}

// ============================================================================
// rollback
// ============================================================================

#[test]
fn rollback_with_unreachable_supervisor_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        r#"
[supervisor]
kind = "pm2"
binary = "/nonexistent/pm2"
start_attempts = 1
command_timeout_secs = 2
"#,
    );

    cutover(&config).args(["init", "api"]).assert().success();

    cutover(&config)
        .args(["rollback", "api", "--output", "json"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("process_failed"));

    // The failed attempt is recorded and blue stays live.
    let output = cutover(&config)
        .args(["status", "api", "-o", "json"])
        .output()
        .unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["active_env"], "blue");
    let history = status["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["status"], "failed");
    assert_eq!(history[0]["reason"], "process_failed");
}

// ============================================================================
// watchdog
// ============================================================================

#[test]
fn systemd_watchdog_without_units_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[supervisor]\nkind = \"systemd\"\n");

    cutover(&config)
        .args(["watchdog", "-o", "json"])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("\"reason\": \"configuration\""))
        .stdout(predicate::str::contains("supervisor.units"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn config_shows_file_values() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[health]\nattempts = 9\n");

    cutover(&config)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"attempts\": 9"));
}

#[test]
fn missing_config_file_is_reported() {
    cutover(Path::new("/nonexistent/cutover.toml"))
        .args(["status", "api", "-o", "json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("configuration"));
}
