// Resilient client for the UniFi Network application API
//
// Owns the single logical connection to the controller: connection state,
// rate limiting, retry with backoff, per-request timeouts and envelope
// normalization. Endpoint helpers (sysinfo, health) live in `system.rs`
// as inherent methods to keep this module focused on request mechanics.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use reqwest::Method;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::{ControllerPlatform, api_key_headers};
use crate::envelope::{Envelope, normalize_body};
use crate::error::Error;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::retry::{RetryConfig, with_retry};
use crate::system::SystemInfo;
use crate::transport::{HttpTransport, TransportConfig, TransportRequest};

/// Path of the authenticated system-info probe, relative to the
/// Network application root.
pub const SYSINFO_PATH: &str = "api/s/{site}/stat/sysinfo";

// ── Configuration ────────────────────────────────────────────────────

/// Everything the resilient client needs, validated upstream.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller root, e.g. `https://192.168.1.1`.
    pub base_url: Url,
    pub api_key: SecretString,
    /// Site name substituted for `{site}` in request paths.
    pub site: String,
    pub transport: TransportConfig,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    /// Skip platform detection when set.
    pub platform: Option<ControllerPlatform>,
}

impl ClientConfig {
    pub fn new(base_url: Url, api_key: SecretString, site: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key,
            site: site.into(),
            transport: TransportConfig::default(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            platform: None,
        }
    }
}

// ── Connection state ─────────────────────────────────────────────────

/// What we learned about the controller on the last successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteInfo {
    pub address: String,
    pub version: String,
    pub model: Option<String>,
    pub site_id: String,
}

/// Observable connection state. Replaced wholesale on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub connected: bool,
    pub authenticated: bool,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub attempt_count: u32,
    pub remote_info: Option<RemoteInfo>,
}

// ── Requests ─────────────────────────────────────────────────────────

/// A request against the Network application.
///
/// `path` is relative to the application root (`api/s/{site}/stat/device`,
/// `v2/api/site/{site}/trafficroutes`); `{site}` is substituted with the
/// configured site. A path starting with `/` is taken from the controller
/// root instead and skips the platform prefix.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Shared, concurrency-safe client. Wrap in an `Arc` and hand it to
/// every consumer; all methods take `&self`.
pub struct ResilientClient {
    config: ClientConfig,
    transport: HttpTransport,
    limiter: RateLimiter,
    state: ArcSwap<ConnectionState>,
    platform: ArcSwapOption<ControllerPlatform>,
    /// Serializes connect / disconnect transitions.
    connect_lock: Mutex<()>,
    /// Cancelled on disconnect, replaced with a fresh token afterwards.
    cancel: ArcSwap<CancellationToken>,
}

impl ResilientClient {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let headers = api_key_headers(&config.api_key)?;
        let transport = HttpTransport::new(&config.transport, headers)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Build around an existing transport (tests, custom TLS setups).
    pub fn with_transport(config: ClientConfig, transport: HttpTransport) -> Self {
        let limiter = RateLimiter::new(config.rate_limit);
        let platform = config.platform.map(Arc::new);
        Self {
            config,
            transport,
            limiter,
            state: ArcSwap::from_pointee(ConnectionState::default()),
            platform: ArcSwapOption::new(platform),
            connect_lock: Mutex::new(()),
            cancel: ArcSwap::from_pointee(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn site(&self) -> &str {
        &self.config.site
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Snapshot of the current connection state.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::clone(&self.state.load())
    }

    pub fn is_connected(&self) -> bool {
        let state = self.state.load();
        state.connected && state.authenticated
    }

    /// Detected (or configured) controller platform.
    pub fn platform(&self) -> Option<ControllerPlatform> {
        self.platform.load().as_deref().copied()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Probe reachability, then confirm the API key with a system-info call.
    pub async fn connect(&self) -> Result<RemoteInfo, Error> {
        let _guard = self.connect_lock.lock().await;
        self.connect_locked().await
    }

    /// Idempotent: clears state and aborts in-flight waits and retries.
    pub async fn disconnect(&self) {
        let previous = self.cancel.swap(Arc::new(CancellationToken::new()));
        previous.cancel();

        let _guard = self.connect_lock.lock().await;
        let was_connected = self.state.load().connected;
        self.state.store(Arc::new(ConnectionState::default()));
        if self.config.platform.is_none() {
            self.platform.store(None);
        }
        if was_connected {
            info!(url = %self.config.base_url, "disconnected from controller");
        }
    }

    async fn ensure_connected(&self) -> Result<(), Error> {
        if self.is_connected() {
            return Ok(());
        }
        let _guard = self.connect_lock.lock().await;
        // Another caller may have connected while we waited for the lock.
        if self.is_connected() {
            return Ok(());
        }
        self.connect_locked().await.map(|_| ())
    }

    async fn connect_locked(&self) -> Result<RemoteInfo, Error> {
        self.state.rcu(|s| ConnectionState {
            attempt_count: s.attempt_count.saturating_add(1),
            ..ConnectionState::clone(s)
        });
        debug!(url = %self.config.base_url, "connecting to controller");

        let result = async {
            let platform = self.probe_platform().await?;
            self.platform.store(Some(Arc::new(platform)));
            debug!(?platform, "controller reachable");

            let envelope = self.execute(&ApiRequest::get(SYSINFO_PATH)).await?;
            let info = SystemInfo::from_value(envelope.first());
            Ok::<_, Error>(RemoteInfo {
                address: self.config.base_url.to_string(),
                version: info.version,
                model: info.model,
                site_id: self.config.site.clone(),
            })
        }
        .await;

        match result {
            Ok(remote) => {
                info!(
                    url = %self.config.base_url,
                    version = %remote.version,
                    "connected to controller"
                );
                self.state.rcu(|s| ConnectionState {
                    connected: true,
                    authenticated: true,
                    last_connected_at: Some(Utc::now()),
                    last_error: None,
                    attempt_count: s.attempt_count,
                    remote_info: Some(remote.clone()),
                });
                Ok(remote)
            }
            Err(err) => {
                warn!(url = %self.config.base_url, error = %err, "connect failed");
                self.state.rcu(|s| ConnectionState {
                    connected: false,
                    authenticated: false,
                    last_error: Some(err.to_string()),
                    ..ConnectionState::clone(s)
                });
                Err(err)
            }
        }
    }

    /// Lightweight unauthenticated probe. Any HTTP answer proves
    /// reachability; the answer's status picks the platform.
    async fn probe_platform(&self) -> Result<ControllerPlatform, Error> {
        let url = self.config.base_url.join(ControllerPlatform::probe_path())?;
        let mut request = TransportRequest::new(Method::GET, url);
        request.timeout = Some(self.config.transport.timeout);
        let resp = self.send_cancellable(request).await?;

        if let Some(platform) = self.config.platform {
            return Ok(platform);
        }
        Ok(if resp.status == 404 {
            ControllerPlatform::ClassicController
        } else {
            ControllerPlatform::UnifiOs
        })
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// The generic primitive: connect if needed, rate-limit, retry,
    /// normalize. A lapsed session is re-established once, transparently.
    pub async fn request(&self, request: ApiRequest) -> Result<Envelope, Error> {
        self.ensure_connected().await?;
        match self.execute(&request).await {
            Err(err) if err.is_auth_expired() => {
                warn!(path = %request.path, "session lapsed, re-authenticating");
                self.mark_lapsed(&err);
                self.ensure_connected().await?;
                self.execute(&request).await
            }
            Err(err) => {
                self.record_error(&err);
                Err(err)
            }
            ok => ok,
        }
    }

    async fn execute(&self, request: &ApiRequest) -> Result<Envelope, Error> {
        let cancel = self.cancel.load_full();
        let cancel = cancel.as_ref();
        let url = self.url_for(&request.path, &request.query)?;
        let timeout = request.timeout.unwrap_or(self.config.transport.timeout);

        with_retry(&self.config.retry, cancel, |attempt| {
            let url = url.clone();
            async move {
                self.limiter.acquire_cancellable(cancel).await?;
                debug!(method = %request.method, %url, attempt, "request");

                let outbound = TransportRequest {
                    method: request.method.clone(),
                    url,
                    headers: reqwest::header::HeaderMap::new(),
                    body: request.body.clone(),
                    timeout: Some(timeout),
                };
                let resp = self.send_cancellable(outbound).await?;
                if !resp.is_success() {
                    return Err(Error::from_status(
                        resp.status,
                        &resp.body,
                        resp.retry_after_secs(),
                    ));
                }
                normalize_body(&resp.body)
            }
        })
        .await
    }

    async fn send_cancellable(
        &self,
        request: TransportRequest,
    ) -> Result<crate::transport::TransportResponse, Error> {
        let cancel = self.cancel.load_full();
        tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            resp = self.transport.send(request) => resp,
        }
    }

    /// Resolve a request path against the base URL and platform prefix.
    pub(crate) fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, Error> {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        let path = path.replace("{site}", &self.config.site);
        let full = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            let prefix = self
                .platform()
                .unwrap_or(ControllerPlatform::ClassicController)
                .network_prefix();
            format!("{base}{prefix}/{path}")
        };

        let mut url = Url::parse(&full)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn mark_lapsed(&self, err: &Error) {
        self.state.rcu(|s| ConnectionState {
            connected: false,
            authenticated: false,
            last_error: Some(err.to_string()),
            ..ConnectionState::clone(s)
        });
    }

    pub(crate) fn record_error(&self, err: &Error) {
        self.state.rcu(|s| ConnectionState {
            last_error: Some(err.to_string()),
            ..ConnectionState::clone(s)
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(platform: ControllerPlatform) -> ResilientClient {
        let mut config = ClientConfig::new(
            Url::parse("https://10.0.0.1/").unwrap(),
            SecretString::from("key".to_string()),
            "default",
        );
        config.platform = Some(platform);
        ResilientClient::new(config).unwrap()
    }

    #[test]
    fn url_building_applies_prefix_and_site() {
        let c = client(ControllerPlatform::UnifiOs);
        let url = c.url_for("api/s/{site}/stat/device", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://10.0.0.1/proxy/network/api/s/default/stat/device"
        );

        let c = client(ControllerPlatform::ClassicController);
        let url = c
            .url_for("api/s/{site}/stat/event", &[("_limit".into(), "5".into())])
            .unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.1/api/s/default/stat/event?_limit=5");
    }

    #[test]
    fn absolute_paths_skip_the_prefix() {
        let c = client(ControllerPlatform::UnifiOs);
        let url = c.url_for("/api/auth/login", &[]).unwrap();
        assert_eq!(url.as_str(), "https://10.0.0.1/api/auth/login");
    }

    #[tokio::test]
    async fn fresh_client_is_disconnected() {
        let c = client(ControllerPlatform::UnifiOs);
        assert!(!c.is_connected());
        assert_eq!(c.state(), ConnectionState::default());
        c.disconnect().await;
        c.disconnect().await;
        assert_eq!(c.state(), ConnectionState::default());
    }
}
