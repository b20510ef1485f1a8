#![allow(clippy::unwrap_used)]
// Integration tests for `ResilientClient` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use unigate_api::{
    ApiRequest, ClientConfig, ConnectFailure, ControllerPlatform, Error, HealthStatus,
    RateLimitConfig, ResilientClient, RetryConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config(base: &str) -> ClientConfig {
    let mut config = ClientConfig::new(
        Url::parse(base).unwrap(),
        SecretString::from("test-key".to_string()),
        "default",
    );
    config.retry = RetryConfig {
        max_attempts: 3,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        jitter: Duration::ZERO,
    };
    config.rate_limit = RateLimitConfig {
        requests_per_minute: 1000,
        window: Duration::from_secs(60),
    };
    config
}

fn sysinfo_envelope(version: &str) -> serde_json::Value {
    json!({
        "meta": { "rc": "ok" },
        "data": [{ "version": version, "ubnt_device_type": "UDMPRO", "hostname": "gw" }]
    })
}

/// Classic controller: login probe 404s, sysinfo answers with an envelope.
async fn setup() -> (MockServer, ResilientClient) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sysinfo_envelope("9.0.114")))
        .mount(&server)
        .await;
    let client = ResilientClient::new(config(&server.uri())).unwrap();
    (server, client)
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_connect_classic_controller() {
    let (_server, client) = setup().await;

    let remote = client.connect().await.unwrap();

    assert_eq!(remote.version, "9.0.114");
    assert_eq!(remote.model.as_deref(), Some("UDMPRO"));
    assert_eq!(remote.site_id, "default");
    assert_eq!(client.platform(), Some(ControllerPlatform::ClassicController));

    let state = client.state();
    assert!(state.connected && state.authenticated);
    assert!(state.last_connected_at.is_some());
    assert_eq!(state.attempt_count, 1);
}

#[tokio::test]
async fn test_connect_detects_unifi_os() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy/network/api/s/default/stat/sysinfo"))
        .and(header("X-API-KEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "8.6.9" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResilientClient::new(config(&server.uri())).unwrap();
    let remote = client.connect().await.unwrap();

    assert_eq!(client.platform(), Some(ControllerPlatform::UnifiOs));
    assert_eq!(remote.version, "8.6.9");
}

#[tokio::test]
async fn test_connect_invalid_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResilientClient::new(config(&server.uri())).unwrap();
    let result = client.connect().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    let state = client.state();
    assert!(!state.connected);
    assert!(state.last_error.is_some());
}

#[tokio::test]
async fn test_connect_refused() {
    let client = ResilientClient::new(ClientConfig {
        retry: RetryConfig::none(),
        ..config("http://127.0.0.1:9")
    })
    .unwrap();

    let result = client.connect().await;

    assert!(
        matches!(
            result,
            Err(Error::Connection {
                cause: ConnectFailure::Refused | ConnectFailure::Unreachable,
                ..
            })
        ),
        "expected Connection error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (_server, client) = setup().await;
    client.connect().await.unwrap();

    client.disconnect().await;
    let first = client.state();
    client.disconnect().await;
    let second = client.state();

    assert!(!first.connected);
    assert_eq!(first, second);
    assert!(!client.is_connected());
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_request_connects_transparently() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [{ "mac": "aa:bb:cc:dd:ee:ff" }, { "mac": "11:22:33:44:55:66" }]
        })))
        .mount(&server)
        .await;

    let envelope = client
        .request(ApiRequest::get("api/s/{site}/stat/device"))
        .await
        .unwrap();

    assert!(client.is_connected());
    assert!(!envelope.is_synthetic());
    assert_eq!(envelope.data.len(), 2);
}

#[tokio::test]
async fn test_direct_object_response_is_normalized() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/v2/api/site/default/trafficroutes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "enabled": true })))
        .mount(&server)
        .await;

    let envelope = client
        .request(ApiRequest::get("v2/api/site/{site}/trafficroutes"))
        .await
        .unwrap();

    assert!(envelope.is_synthetic());
    assert_eq!(envelope.data, vec![json!({ "enabled": true })]);
}

#[tokio::test]
async fn test_query_parameters_are_sent() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/event"))
        .and(query_param("_limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client
        .request(ApiRequest::get("api/s/{site}/stat/event").with_query("_limit", "5"))
        .await
        .unwrap();
    assert!(envelope.data.is_empty());
}

#[tokio::test]
async fn test_controller_error_envelope() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/s/default/cmd/devmgr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "error", "msg": "api.err.UnknownDevice" },
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .request(ApiRequest::post(
            "api/s/{site}/cmd/devmgr",
            json!({ "cmd": "restart", "mac": "aa:bb:cc:dd:ee:ff" }),
        ))
        .await;

    match result {
        Err(Error::Controller { ref message }) => assert!(message.contains("UnknownDevice")),
        other => panic!("expected Controller error, got: {other:?}"),
    }
}

// ── Retry ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_server_errors_then_succeeds() {
    let (server, client) = setup().await;
    client.connect().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/health"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [{ "subsystem": "wan", "status": "ok" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client
        .request(ApiRequest::get("api/s/{site}/stat/health"))
        .await
        .unwrap();
    assert_eq!(envelope.first()["subsystem"], "wan");
}

#[tokio::test]
async fn test_validation_error_is_not_retried() {
    let (server, client) = setup().await;
    client.connect().await.unwrap();

    Mock::given(method("POST"))
        .and(path("/api/s/default/rest/networkconf"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid vlan"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .request(ApiRequest::post("api/s/{site}/rest/networkconf", json!({ "vlan": 9999 })))
        .await;

    assert!(
        matches!(result, Err(Error::Validation { status: 400, .. })),
        "expected Validation error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_rate_limited_honors_retry_after() {
    let (server, client) = setup().await;
    client.connect().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sta"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .request(ApiRequest::get("api/s/{site}/stat/sta"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_retries_exhausted() {
    let (server, client) = setup().await;
    client.connect().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let result = client.request(ApiRequest::get("api/s/{site}/stat/device")).await;
    assert!(matches!(result, Err(Error::Server { status: 502, .. })));
    assert!(client.state().last_error.is_some());
}

// ── Re-authentication ───────────────────────────────────────────────

#[tokio::test]
async fn test_lapsed_session_reauthenticates_once() {
    let (server, client) = setup().await;
    client.connect().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/api/s/default/rest/firewallrule"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/rest/firewallrule"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": { "rc": "ok" },
            "data": [{ "name": "block-iot" }]
        })))
        .mount(&server)
        .await;

    let envelope = client
        .request(ApiRequest::get("api/s/{site}/rest/firewallrule"))
        .await
        .unwrap();

    assert_eq!(envelope.first()["name"], "block-iot");
    assert!(client.is_connected());
    assert_eq!(client.state().attempt_count, 2);
}

// ── Concurrency ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_requests_connect_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/sysinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sysinfo_envelope("9.1.0")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/s/default/stat/device"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "meta": { "rc": "ok" }, "data": [] })))
        .expect(5)
        .mount(&server)
        .await;

    let client = Arc::new(ResilientClient::new(config(&server.uri())).unwrap());
    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                client
                    .request(ApiRequest::get("api/s/{site}/stat/device"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

// ── Health ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_check_healthy() {
    let (_server, client) = setup().await;

    let report = client.health_check().await;

    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.connected && report.authenticated);
    assert_eq!(report.version.as_deref(), Some("9.0.114"));
    assert!(report.last_error.is_none());
}

#[tokio::test]
async fn test_health_check_unreachable() {
    let client = ResilientClient::new(ClientConfig {
        retry: RetryConfig::none(),
        ..config("http://127.0.0.1:9")
    })
    .unwrap();

    let report = client.health_check().await;

    assert!(!report.is_healthy());
    assert!(!report.connected);
    assert!(report.last_error.is_some());
}
