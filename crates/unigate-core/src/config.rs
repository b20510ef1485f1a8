// ── Runtime gateway configuration ──
//
// Describes *how* to reach one controller and how hard to push it.
// Never touches disk: `unigate-config` (or a test) builds a `GatewayConfig`,
// validates it, and hands it to `Gateway::new`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use unigate_api::{ClientConfig, RateLimitConfig, RetryConfig, TlsMode, TransportConfig};
use url::Url;

use crate::capability::DEFAULT_CAPABILITY_TTL;
use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs). Default for local controllers.
    #[default]
    DangerAcceptInvalid,
}

impl From<TlsVerification> for TlsMode {
    fn from(tls: TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Configuration for one controller connection.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Controller URL (e.g., `https://192.168.1.1`).
    pub url: Url,
    pub api_key: SecretString,
    /// Site to operate on (defaults to "default").
    pub site: String,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    /// Capability snapshot validity window.
    pub capability_ttl: Duration,
    /// Period of the background health monitor. `None` = no monitor.
    pub health_check_interval: Option<Duration>,
}

impl GatewayConfig {
    /// Defaults for everything but the controller and credential.
    pub fn new(url: Url, api_key: SecretString) -> Self {
        Self {
            url,
            api_key,
            site: "default".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            capability_ttl: DEFAULT_CAPABILITY_TTL,
            health_check_interval: None,
        }
    }

    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| {
            Err(CoreError::Config {
                message: message.to_owned(),
            })
        };

        if !matches!(self.url.scheme(), "http" | "https") {
            return invalid("controller URL must use http or https");
        }
        if self.url.host_str().is_none() {
            return invalid("controller URL has no host");
        }
        if self.site.trim().is_empty() {
            return invalid("site must not be empty");
        }
        if self.api_key.expose_secret().trim().is_empty() {
            return invalid("API key must not be empty");
        }
        if self.timeout.is_zero() {
            return invalid("timeout must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry attempts must be at least 1");
        }
        if self.retry.base_delay > self.retry.max_delay {
            return invalid("retry base delay must not exceed max delay");
        }
        if self.rate_limit.requests_per_minute == 0 {
            return invalid("requests per minute must be at least 1");
        }
        if self.rate_limit.window.is_zero() {
            return invalid("rate limit window must be greater than zero");
        }
        if self.health_check_interval.is_some_and(|i| i.is_zero()) {
            return invalid("health check interval must be greater than zero");
        }
        Ok(())
    }

    /// Validated client configuration.
    pub fn client_config(&self) -> Result<ClientConfig, CoreError> {
        self.validate()?;
        let mut config = ClientConfig::new(self.url.clone(), self.api_key.clone(), self.site.clone());
        config.transport = TransportConfig {
            tls: self.tls.clone().into(),
            timeout: self.timeout,
        };
        config.retry = self.retry;
        config.rate_limit = self.rate_limit;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> GatewayConfig {
        GatewayConfig::new(
            Url::parse("https://192.168.1.1").unwrap(),
            SecretString::from("key".to_string()),
        )
    }

    #[test]
    fn defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.site, "default");
        assert_eq!(config.capability_ttl, Duration::from_secs(3600));

        let client = config.client_config().unwrap();
        assert_eq!(client.transport.tls, TlsMode::DangerAcceptInvalid);
        assert_eq!(client.rate_limit.requests_per_minute, 60);
    }

    #[test]
    fn rejects_bad_values() {
        let mut bad = config();
        bad.url = Url::parse("ftp://192.168.1.1").unwrap();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.site = "  ".into();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.api_key = SecretString::from(String::new());
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.timeout = Duration::ZERO;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.retry.max_attempts = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.retry.base_delay = Duration::from_secs(60);
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.rate_limit.requests_per_minute = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.rate_limit.requests_per_minute = 0;
        assert!(bad.client_config().is_err());
    }
}
