use thiserror::Error;

/// Why a connection attempt never produced an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The host answered but refused the TCP connection.
    Refused,
    /// DNS resolution failed.
    HostNotFound,
    /// Any other socket-level failure (reset, unreachable network, ...).
    Unreachable,
}

impl std::fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Refused => "connection refused",
            Self::HostNotFound => "host not found",
            Self::Unreachable => "host unreachable",
        })
    }
}

/// Top-level error type for the `unigate-api` crate.
///
/// Raw `reqwest` failures are classified into these variants inside the
/// transport layer, so nothing above this crate ever inspects a transport
/// exception. `unigate-core` maps them onto its error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials rejected (HTTP 401, UniFi OS 401 wrapper).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// API key cannot be used as a header value.
    #[error("Invalid API key: {reason}")]
    InvalidApiKey { reason: String },

    /// Authenticated but not allowed (HTTP 403).
    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Could not reach the controller at all.
    #[error("Cannot connect to {url}: {cause} ({reason})")]
    Connection {
        url: String,
        cause: ConnectFailure,
        reason: String,
    },

    /// Request exceeded its timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS handshake or certificate verification error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Any other HTTP transport failure.
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── HTTP status ─────────────────────────────────────────────────
    /// HTTP 429. `retry_after_secs` is the server's hint, when present.
    #[error("Rate limited by controller{}", .retry_after_secs.map(|s| format!(" -- retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 5xx.
    #[error("Controller error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// HTTP 400 / 422: the request itself was rejected.
    #[error("Request rejected (HTTP {status}): {message}")]
    Validation { status: u16, message: String },

    /// Any other non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Status { status: u16, message: String },

    // ── Envelope ────────────────────────────────────────────────────
    /// `meta.rc == "error"` inside an otherwise successful response.
    #[error("Controller API error: {message}")]
    Controller { message: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Lifecycle ───────────────────────────────────────────────────
    /// The request was aborted by `disconnect()` or caller cancellation.
    #[error("Request cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` if the retry loop may re-attempt after this error.
    ///
    /// Network failures, timeouts, 5xx and 429 qualify. Authentication,
    /// validation and envelope errors never do.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::Timeout { .. }
                | Self::Transport(_)
                | Self::RateLimited { .. }
                | Self::Server { .. }
        )
    }

    /// Returns `true` if the session has lapsed and re-authentication
    /// might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// HTTP status code behind this error, if there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. }
            | Self::Validation { status, .. }
            | Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map a non-success status and its body to the matching variant.
    pub(crate) fn from_status(status: u16, body: &str, retry_after_secs: Option<u64>) -> Self {
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body_preview(body)
        };
        match status {
            401 => Self::Authentication {
                message: "session expired or invalid API key".into(),
            },
            403 => Self::Forbidden { message },
            429 => Self::RateLimited { retry_after_secs },
            400 | 422 => Self::Validation { status, message },
            500..=599 => Self::Server { status, message },
            _ => Self::Status { status, message },
        }
    }
}

/// First 200 characters of a response body, cut on a char boundary.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(
            Error::Connection {
                url: "https://10.0.0.1".into(),
                cause: ConnectFailure::Refused,
                reason: String::new(),
            }
            .is_retryable()
        );
        assert!(Error::RateLimited { retry_after_secs: None }.is_retryable());
        assert!(Error::from_status(503, "busy", None).is_retryable());
        assert!(!Error::from_status(401, "", None).is_retryable());
        assert!(!Error::from_status(422, "bad vlan", None).is_retryable());
        assert!(!Error::Tls("untrusted".into()).is_retryable());
    }

    #[test]
    fn multibyte_body_is_truncated_on_char_boundary() {
        // 'é' occupies bytes 199..201.
        let body = format!("{}é and more", "x".repeat(199));
        match Error::from_status(503, &body, None) {
            Error::Server { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message.chars().count(), 200);
                assert!(message.ends_with('é'));
            }
            other => panic!("expected Server, got {other:?}"),
        }
        assert_eq!(body_preview("short"), "short");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            Error::from_status(429, "", Some(3)),
            Error::RateLimited {
                retry_after_secs: Some(3)
            }
        ));
        assert!(matches!(
            Error::from_status(404, "", None),
            Error::Status { status: 404, .. }
        ));
        assert!(matches!(
            Error::from_status(400, "missing name", None),
            Error::Validation { status: 400, .. }
        ));
    }
}
