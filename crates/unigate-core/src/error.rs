// ── Core error types ──
//
// Every failure the broker can report, independent of HTTP details.
// The `From<unigate_api::Error>` impl translates transport-layer errors
// into the taxonomy exactly once, so nothing above the client ever looks
// at status codes or raw transport failures.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

use crate::capability::Feature;

/// Machine-readable failure classification surfaced to callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ConnectionFailure,
    AuthenticationFailure,
    TlsFailure,
    RateLimited,
    FeatureNotSupported,
    HardwareIncompatible,
    ValidationError,
    OperationNotFound,
    OperationDisabled,
    ConnectionRequired,
    FeatureUnavailable,
    DependencyFailed,
    ExecutionError,
    CapabilityDetectionFailure,
}

impl ErrorKind {
    /// Stable code string, e.g. `"OPERATION_NOT_FOUND"`.
    pub fn code(self) -> &'static str {
        self.into()
    }

    /// Retryability hint. Only the client's retry loop acts on it.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ConnectionFailure | Self::RateLimited)
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("TLS verification failed: {message}")]
    Tls { message: String },

    #[error("Rate limited by controller")]
    RateLimited { retry_after_secs: Option<u64> },

    // ── Capabilities ─────────────────────────────────────────────────
    #[error("Feature '{feature}' is not supported: {reason}")]
    FeatureNotSupported {
        feature: Feature,
        required_version: String,
        current_version: String,
        /// Names the gate that failed.
        reason: String,
    },

    #[error("Feature '{feature}' is not available on {model} (compatible: {})", .compatible.join(", "))]
    HardwareIncompatible {
        feature: Feature,
        model: String,
        compatible: Vec<String>,
    },

    #[error("Capability detection failed: {reason}")]
    CapabilityDetection { reason: String },

    // ── Dispatch ─────────────────────────────────────────────────────
    #[error("Operation '{name}' not found")]
    OperationNotFound { name: String },

    #[error("Operation '{name}' is disabled")]
    OperationDisabled { name: String },

    #[error("Operation '{name}' requires an active controller connection")]
    ConnectionRequired { name: String },

    #[error("Operation '{name}' is unavailable: {reason}")]
    FeatureUnavailable {
        name: String,
        feature: Feature,
        reason: String,
    },

    #[error("Operation '{name}' dependency '{dependency}' not satisfied: {reason}")]
    DependencyFailed {
        name: String,
        dependency: String,
        reason: String,
    },

    // ── Execution ────────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Operation failed: {message}")]
    Execution { message: String },

    #[error("Request cancelled")]
    Cancelled,

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// The single taxonomy kind this error maps to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionFailed { .. } => ErrorKind::ConnectionFailure,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailure,
            Self::Tls { .. } => ErrorKind::TlsFailure,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::FeatureNotSupported { .. } => ErrorKind::FeatureNotSupported,
            Self::HardwareIncompatible { .. } => ErrorKind::HardwareIncompatible,
            Self::CapabilityDetection { .. } => ErrorKind::CapabilityDetectionFailure,
            Self::OperationNotFound { .. } => ErrorKind::OperationNotFound,
            Self::OperationDisabled { .. } => ErrorKind::OperationDisabled,
            Self::ConnectionRequired { .. } => ErrorKind::ConnectionRequired,
            Self::FeatureUnavailable { .. } => ErrorKind::FeatureUnavailable,
            Self::DependencyFailed { .. } => ErrorKind::DependencyFailed,
            Self::Validation { .. } | Self::Config { .. } => ErrorKind::ValidationError,
            Self::Api { .. } | Self::Execution { .. } | Self::Cancelled => {
                ErrorKind::ExecutionError
            }
        }
    }

    /// Retryability hint: the kind's hint, plus 5xx-derived API errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api {
                status: Some(status),
                ..
            } => *status >= 500,
            other => other.kind().is_retryable(),
        }
    }

    /// Structured details for the invocation result, when there are any.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::FeatureNotSupported {
                feature,
                required_version,
                current_version,
                reason,
            } => Some(json!({
                "feature": feature,
                "reason": reason,
                "requiredVersion": required_version,
                "currentVersion": current_version,
            })),
            Self::HardwareIncompatible {
                feature,
                model,
                compatible,
            } => Some(json!({
                "feature": feature,
                "model": model,
                "compatibleHardware": compatible,
            })),
            Self::FeatureUnavailable { feature, .. } => Some(json!({ "feature": feature })),
            Self::DependencyFailed { dependency, .. } => {
                Some(json!({ "dependency": dependency }))
            }
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(json!({ "retryAfterSecs": secs })),
            Self::Api {
                status: Some(status),
                ..
            } => Some(json!({ "status": status })),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<unigate_api::Error> for CoreError {
    fn from(err: unigate_api::Error) -> Self {
        use unigate_api::Error as Api;

        match err {
            Api::Connection { ref url, .. } => CoreError::ConnectionFailed {
                url: url.clone(),
                reason: err.to_string(),
            },
            Api::Timeout { .. } | Api::Transport(_) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: err.to_string(),
            },
            Api::Tls(message) => CoreError::Tls { message },
            Api::Authentication { message } | Api::Forbidden { message } => {
                CoreError::AuthenticationFailed { message }
            }
            Api::InvalidApiKey { reason } => CoreError::AuthenticationFailed {
                message: format!("invalid API key: {reason}"),
            },
            Api::RateLimited { retry_after_secs } => CoreError::RateLimited { retry_after_secs },
            Api::Validation { message, .. } => CoreError::Validation { message },
            Api::Server { status, message } | Api::Status { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::Controller { message } => CoreError::Api {
                message,
                status: None,
            },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Deserialization { message, body: _ } => CoreError::Execution {
                message: format!("Deserialization error: {message}"),
            },
            Api::Cancelled => CoreError::Cancelled,
        }
    }
}
