//! End-to-end CLI tests for the imgview binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

mod support;
use support::fixtures::{item_url, mount_assets, mount_handshake};
use support::socket_guard::start_mock_server_or_skip;

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("image-host"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("imgview"));
}

/// Test that a missing subcommand is a usage error.
#[test]
fn test_binary_without_subcommand_fails() {
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.assert().failure().stderr(predicate::str::contains("Usage"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.args(["view", "--invalid-flag", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that an unsupported host fails with a suggestion.
#[test]
fn test_unsupported_url_reports_no_provider() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("--cache-dir")
        .arg(dir.path())
        .args(["-q", "-r", "1", "view", "https://example.com/abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no provider"))
        .stderr(predicate::str::contains("Suggestion"));
}

/// Test that --saved-proxy without a remembered proxy fails early.
#[test]
fn test_saved_proxy_without_file_fails() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.arg("--proxy-file")
        .arg(dir.path().join("proxy.txt"))
        .args(["-q", "--saved-proxy", "view", "https://imgrock.pw/abc123"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No saved proxy"));
}

/// Test that --max-attempts outside 1..=20 is rejected.
#[test]
fn test_max_attempts_out_of_range_is_rejected() {
    let mut cmd = Command::cargo_bin("imgview").unwrap();
    cmd.args(["-r", "0", "view", "https://imgrock.pw/abc123"])
        .assert()
        .failure();
}

/// Test a full view against a mock host with JSON output.
#[tokio::test]
async fn test_view_json_against_mock_host() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_handshake(&server, "abc123", 1).await;
    mount_assets(&server, "abc123", 1).await;
    let dir = TempDir::new().unwrap();
    let uri = server.uri();
    let cache_dir = dir.path().join("cache");
    let out_dir = dir.path().join("out");

    let assert = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("imgview")
            .unwrap()
            .arg("--origin")
            .arg(&uri)
            .arg("--cache-dir")
            .arg(&cache_dir)
            .arg("--output-dir")
            .arg(&out_dir)
            .args(["-q", "view", "--save", "--json", &item_url("abc123")])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("\"image_name\": \"pic_abc123\""))
        .stdout(predicate::str::contains("\"width\": 900"))
        .stdout(predicate::str::contains("next222"));
    assert!(dir.path().join("out").join("pic_abc123").is_file());
}
