//! Integration tests for the `unigate` binary.
//!
//! Argument parsing, help, completions, and error exit codes run without a
//! controller; the command round trips run against a wiremock controller.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `unigate` binary with env isolation.
///
/// Clears all `UNIGATE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn unigate_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("unigate");
    cmd.env("HOME", "/tmp/unigate-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/unigate-cli-test-nonexistent")
        .env_remove("UNIGATE_PROFILE")
        .env_remove("UNIGATE_CONTROLLER")
        .env_remove("UNIGATE_SITE")
        .env_remove("UNIGATE_API_KEY")
        .env_remove("UNIGATE_OUTPUT")
        .env_remove("UNIGATE_INSECURE")
        .env_remove("UNIGATE_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn controller() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [{ "version": "8.6.9", "model": "UDMPRO" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [
                { "mac": "aa:bb:cc:dd:ee:01", "name": "Office AP", "type": "uap" },
                { "mac": "aa:bb:cc:dd:ee:02", "name": "Core Switch", "type": "usw" }
            ]
        })))
        .mount(&server)
        .await;
    server
}

/// Run the binary against `server` off the async runtime.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let uri = server.uri();
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    tokio::task::spawn_blocking(move || {
        unigate_cmd()
            .args(["--controller", &uri, "--api-key", "test-key"])
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = unigate_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    unigate_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("UniFi")
            .and(predicate::str::contains("ops"))
            .and(predicate::str::contains("capabilities"))
            .and(predicate::str::contains("serve")),
    );
}

#[test]
fn test_version_flag() {
    unigate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unigate"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_zsh() {
    unigate_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_bash() {
    unigate_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_prints_toml_location() {
    unigate_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = unigate_cmd().arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected the bad subcommand in:\n{text}");
}

#[test]
fn test_ops_without_controller_is_no_config() {
    let output = unigate_cmd().args(["ops", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(
        text.contains("No controller configured"),
        "Expected no-config diagnostic:\n{text}"
    );
}

#[test]
fn test_missing_api_key_is_auth_exit_code() {
    let output = unigate_cmd()
        .args(["--controller", "https://127.0.0.1:9", "ops", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_invalid_call_arguments_are_usage_errors() {
    let output = unigate_cmd()
        .args([
            "--controller",
            "https://127.0.0.1:9",
            "--api-key",
            "k",
            "ops",
            "call",
            "unifi_list_devices",
            "--args",
            "[1]",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Against a controller ────────────────────────────────────────────

#[test]
fn test_ops_list_needs_no_connection() {
    let output = unigate_cmd()
        .args([
            "--controller",
            "https://127.0.0.1:9",
            "--api-key",
            "k",
            "-o",
            "plain",
            "ops",
            "list",
            "--category",
            "devices",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "unifi_list_devices"));
    assert!(stdout.lines().all(|l| !l.contains("firewall")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ops_call_prints_invocation_result() {
    let server = controller().await;
    let output = run_against(
        &server,
        &[
            "-o",
            "json-compact",
            "ops",
            "call",
            "unifi_list_devices",
            "--args",
            r#"{"type":"uap"}"#,
        ],
    )
    .await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["data"].as_array().unwrap().len(), 1);
    assert_eq!(result["data"][0]["name"], json!("Office AP"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_gated_operation_fails_with_result_and_exit_code() {
    let server = controller().await;
    let output = run_against(
        &server,
        &["-o", "json-compact", "ops", "call", "unifi_list_firewall_policies"],
    )
    .await;

    assert_eq!(output.status.code(), Some(1));
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], json!(false));
    assert_eq!(result["error"]["code"], json!("FEATURE_UNAVAILABLE"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_available_hides_gated_operations() {
    let server = controller().await;
    let output = run_against(&server, &["-o", "plain", "ops", "available"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "unifi_list_devices"));
    assert!(!stdout.lines().any(|l| l == "unifi_list_firewall_policies"));
    assert!(!stdout.lines().any(|l| l == "unifi_list_firewall_zones"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_capabilities_json() {
    let server = controller().await;
    let output = run_against(&server, &["-o", "json", "capabilities"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let snapshot: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["normalizedVersion"], json!("8.6.9"));
    assert_eq!(snapshot["featureFlags"]["supports_traffic_routes"], json!(true));
    assert_eq!(
        snapshot["featureFlags"]["supports_zone_based_firewall"],
        json!(false)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_serve_answers_each_line() {
    let server = controller().await;
    let uri = server.uri();
    let output = tokio::task::spawn_blocking(move || {
        unigate_cmd()
            .args(["--controller", &uri, "--api-key", "test-key", "serve"])
            .write_stdin(concat!(
                r#"{"id":1,"method":"health"}"#,
                "\n",
                r#"{"id":2,"method":"invoke","params":{"name":"unifi_list_devices"}}"#,
                "\n",
            ))
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let responses: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["status"], json!("healthy"));
    assert_eq!(responses[1]["id"], json!(2));
    assert_eq!(responses[1]["result"]["success"], json!(true));
}
