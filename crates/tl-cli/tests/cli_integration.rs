//! CLI integration tests
//!
//! Tests the ttylog CLI using assert_cmd.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ttylog() -> Command {
    let mut cmd = Command::cargo_bin("ttylog")
        .expect("Failed to locate ttylog binary - ensure it's built before running tests");
    cmd.env_remove("TTYLOG_CONFIG").env_remove("RUST_LOG");
    cmd
}

/// A config file whose logs directory lives in the temp dir
fn write_config(dir: &TempDir, target: &str) -> PathBuf {
    let logs = dir.path().join("logs");
    let path = dir.path().join("config.toml");
    let contents = format!(
        "[target]\n{}\n\n[recorder]\nlogs_dir = {:?}\n",
        target,
        logs.to_string_lossy()
    );
    fs::write(&path, contents).unwrap();
    path
}

fn logs_dir(dir: &TempDir) -> PathBuf {
    dir.path().join("logs")
}

fn write_log(dir: &Path, name: &str, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_cli_help() {
    ttylog()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ttylog"))
        .stdout(predicate::str::contains("TTY log over SSH"));
}

#[test]
fn test_cli_version() {
    ttylog()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ttylog"));
}

#[test]
fn test_cli_stream_help() {
    ttylog()
        .args(["stream", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--record"))
        .stdout(predicate::str::contains("--save-on-exit"));
}

#[test]
fn test_cli_requires_subcommand() {
    ttylog().assert().failure();
}

#[test]
fn test_config_path_honours_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    ttylog()
        .args(["config", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_get_defaults_without_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.toml");
    ttylog()
        .args(["config", "get", "target.port", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout("22\n");
}

#[test]
fn test_config_init_then_get() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    ttylog()
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());

    ttylog()
        .args(["config", "get", "target.remote_path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout("/tmp/ttyLog\n");

    // Refuses to overwrite without --force
    ttylog()
        .args(["config", "init", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "host = \"10.1.1.1\"");
    ttylog()
        .args(["config", "get", "target.colour", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Key not found"));
}

#[test]
fn test_config_get_reads_file_value() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "host = \"10.1.1.1\"");
    ttylog()
        .args(["config", "get", "target.host", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout("10.1.1.1\n");
}

#[test]
fn test_logs_list_empty() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    ttylog()
        .args(["logs", "list", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved logs"));
}

#[test]
fn test_logs_list_show_delete() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    let name = "adapter_tty_101500_02FEB25.log";
    write_log(&logs_dir(&dir), name, "[10:15:00.000] hello\n");

    ttylog()
        .args(["logs", "list", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(name));

    ttylog()
        .args(["logs", "show", name, "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("] hello"));

    ttylog()
        .args(["logs", "delete", name, "--config"])
        .arg(&path)
        .assert()
        .success();
    assert!(!logs_dir(&dir).join(name).exists());

    ttylog()
        .args(["logs", "show", name, "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_logs_export_copies_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    let name = "adapter_tty_101500_02FEB25.log";
    write_log(&logs_dir(&dir), name, "[10:15:00.000] exported\n");
    let dest = dir.path().join("out.log");

    ttylog()
        .args(["logs", "export", name])
        .arg(&dest)
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported"));

    assert_eq!(fs::read_to_string(&dest).unwrap(), "[10:15:00.000] exported\n");
    assert!(logs_dir(&dir).join(name).exists());

    ttylog()
        .args(["logs", "export", "adapter_tty_missing.log"])
        .arg(&dest)
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_logs_show_rejects_traversal() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    ttylog()
        .args(["logs", "show", "../config.toml", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log name"));
}

#[test]
fn test_logs_path() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    ttylog()
        .args(["logs", "path", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("logs"));
}

#[test]
fn test_stream_rejects_invalid_target() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "max_retry_attempts = 0");
    ttylog()
        .args(["stream", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_retry_attempts"));
}

#[test]
fn test_stream_gives_up_on_unreachable_host() {
    let dir = TempDir::new().unwrap();
    // TEST-NET-1 address: never routable
    let path = write_config(
        &dir,
        "host = \"192.0.2.1\"\nconnect_timeout = 300\nmax_retry_attempts = 2\nretry_interval = 50",
    );
    ttylog()
        .args(["stream", "--save-on-exit", "--config"])
        .arg(&path)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Connecting (1/2)"))
        .stderr(predicate::str::contains("Failed after 2 attempts"));

    // The empty buffer is still saved on exit
    let saved = fs::read_dir(logs_dir(&dir)).unwrap().count();
    assert_eq!(saved, 1);
}
