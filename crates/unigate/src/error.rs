//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use unigate_config::ConfigError;
use unigate_core::{CoreError, ErrorKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}")]
    #[diagnostic(
        code(unigate::connection_failed),
        help(
            "Check that the controller is running and accessible.\n\
             Reason: {reason}\n\
             Try: unigate health --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(unigate::timeout),
        help("Increase timeout with --timeout or check controller responsiveness.\n{reason}")
    )]
    Timeout { reason: String },

    #[error("TLS certificate verification failed")]
    #[diagnostic(
        code(unigate::tls_error),
        help(
            "{message}\n\
             Use --insecure (-k) to accept a self-signed certificate, or configure ca_cert in your profile."
        )
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(unigate::auth_failed),
        help(
            "Verify your API key.\n\
             Keys are created under Settings > Control Plane > Integrations on the controller."
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(unigate::no_credentials),
        help(
            "Store one with: unigate config set-key --profile {profile}\n\
             Or set the UNIGATE_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Operation '{name}' not found")]
    #[diagnostic(
        code(unigate::not_found),
        help("Run: unigate ops list to see registered operations")
    )]
    OperationNotFound { name: String },

    #[error("{code}: {message}")]
    #[diagnostic(code(unigate::operation_failed))]
    OperationFailed { code: ErrorKind, message: String },

    #[error("Capability detection failed: {reason}")]
    #[diagnostic(code(unigate::capabilities))]
    CapabilityDetection { reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(unigate::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(unigate::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(unigate::no_config),
        help(
            "Pass --controller and --api-key, or create a profile in\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(unigate::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(unigate::json), help("Arguments must be a JSON object."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::OperationNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Json(_) => exit_code::USAGE,
            Self::OperationFailed { code, .. } => kind_exit_code(*code),
            _ => exit_code::GENERAL,
        }
    }
}

fn kind_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::ConnectionFailure | ErrorKind::TlsFailure | ErrorKind::ConnectionRequired => {
            exit_code::CONNECTION
        }
        ErrorKind::AuthenticationFailure => exit_code::AUTH,
        ErrorKind::OperationNotFound => exit_code::NOT_FOUND,
        ErrorKind::ValidationError => exit_code::USAGE,
        _ => exit_code::GENERAL,
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                if reason.contains("timed out") {
                    CliError::Timeout { reason }
                } else {
                    CliError::ConnectionFailed { url, reason }
                }
            }
            CoreError::Tls { message } => CliError::TlsError { message },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::OperationNotFound { name } => CliError::OperationNotFound { name },
            CoreError::CapabilityDetection { reason } => CliError::CapabilityDetection { reason },
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::OperationFailed {
                code: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Gateway(core) => core.into(),
            other => CliError::Config(other),
        }
    }
}
