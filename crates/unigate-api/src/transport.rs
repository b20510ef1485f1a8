// Raw HTTP(S) execution shared by every request the client issues.
//
// Builds the `reqwest::Client` (TLS mode, default timeout, auth headers)
// and classifies transport failures into typed `Error` variants as close
// to the source as possible.

use std::error::Error as _;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::trace;
use url::Url;

use crate::error::{ConnectFailure, Error};

/// TLS verification mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed controllers).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` carrying `headers` on every request.
    pub fn build_client(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("unigate/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

// ── Request / response ───────────────────────────────────────────────

/// One outbound HTTP request, fully resolved.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    /// Overrides the client-wide timeout for this request.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// Status, headers and body text of a completed exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `Retry-After` in whole seconds, if the server sent a numeric hint.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }
}

// ── HttpTransport ────────────────────────────────────────────────────

/// Thin executor over `reqwest::Client`.
///
/// Never interprets status codes -- that belongs to the resilient client.
/// Only failures that produced no response are turned into errors here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    default_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig, headers: HeaderMap) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client(headers)?,
            default_timeout: config.timeout,
        })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, default_timeout: Duration) -> Self {
        Self {
            http,
            default_timeout,
        }
    }

    pub async fn send(&self, request: TransportRequest) -> Result<TransportResponse, Error> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);
        let url = request.url.clone();
        trace!(method = %request.method, %url, "sending request");

        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(timeout);
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| classify(&e, &url, timeout))?;

        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.text().await.map_err(|e| classify(&e, &url, timeout))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map a `reqwest` failure onto exactly one typed error.
///
/// Only the source chain is inspected: the top-level message embeds the
/// request URL, which may itself contain words like "ssl" or "tls".
/// TLS failures surface as connect errors in `reqwest`, so the TLS check
/// runs before the generic connect branch.
pub(crate) fn classify(err: &reqwest::Error, url: &Url, timeout: Duration) -> Error {
    if err.is_timeout() {
        return Error::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };
    }

    let causes = sources(err)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ");
    let lower = causes.to_lowercase();
    let detail = if causes.is_empty() {
        err.to_string()
    } else {
        format!("{err}: {causes}")
    };

    if !err.is_connect() {
        return Error::Transport(detail);
    }

    let io_kind = sources(err)
        .find_map(|e| e.downcast_ref::<io::Error>())
        .map(io::Error::kind);

    // rustls reports handshake and certificate failures as `InvalidData`.
    if io_kind == Some(io::ErrorKind::InvalidData)
        || ["certificate", "tls", "handshake"]
            .iter()
            .any(|needle| lower.contains(needle))
    {
        return Error::Tls(detail);
    }

    let cause = if io_kind == Some(io::ErrorKind::ConnectionRefused)
        || lower.contains("connection refused")
    {
        ConnectFailure::Refused
    } else if [
        "dns error",
        "failed to lookup address",
        "no such host",
        "name or service not known",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
    {
        ConnectFailure::HostNotFound
    } else {
        ConnectFailure::Unreachable
    };
    Error::Connection {
        url: url.to_string(),
        cause,
        reason: detail,
    }
}

fn sources(err: &reqwest::Error) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
    std::iter::successors(err.source(), |e| (*e).source())
}
