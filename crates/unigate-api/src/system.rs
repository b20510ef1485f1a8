// System-level endpoints: sysinfo probe and health check.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::client::{ApiRequest, ResilientClient, SYSINFO_PATH};
use crate::error::Error;

/// Controller system information.
///
/// The field set varies by platform and firmware version, so only the
/// fields we rely on are pulled out; the full payload stays in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    /// Raw version string as reported (may carry build suffixes).
    pub version: String,
    /// Hardware model, when the controller reports one.
    pub model: Option<String>,
    pub hostname: Option<String>,
    pub name: Option<String>,
    pub build: Option<String>,
    pub raw: Value,
}

impl SystemInfo {
    /// Extract from a sysinfo record, tolerating missing fields.
    pub fn from_value(value: &Value) -> Self {
        let string = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| value.get(*k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        Self {
            version: string(&["version", "console_display_version", "firmware_version"])
                .unwrap_or_else(|| "unknown".to_owned()),
            model: string(&["model", "ubnt_device_type", "hardware_model", "device_type"]),
            hostname: string(&["hostname"]),
            name: string(&["name"]),
            build: string(&["build"]),
            raw: value.clone(),
        }
    }
}

/// Outcome of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        })
    }
}

/// Result of [`ResilientClient::health_check`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub connected: bool,
    pub authenticated: bool,
    pub latency_ms: u64,
    pub version: Option<String>,
    pub last_error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

impl ResilientClient {
    /// Get controller system information.
    ///
    /// `GET /api/s/{site}/stat/sysinfo`, either envelope shape.
    pub async fn get_system_info(&self) -> Result<SystemInfo, Error> {
        debug!("fetching sysinfo");
        let envelope = self.request(ApiRequest::get(SYSINFO_PATH)).await?;
        Ok(SystemInfo::from_value(envelope.first()))
    }

    /// Connect if needed, fetch sysinfo, and time the round trip.
    ///
    /// Healthy only if both connectivity and authentication hold. The most
    /// recent error is retained on failure.
    pub async fn health_check(&self) -> HealthReport {
        let start = Instant::now();
        let result = self.get_system_info().await;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Err(ref err) = result {
            self.record_error(err);
        }
        let state = self.state();
        let healthy = result.is_ok() && state.connected && state.authenticated;

        HealthReport {
            status: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            connected: state.connected,
            authenticated: state.authenticated,
            latency_ms,
            version: result.ok().map(|info| info.version),
            last_error: if healthy { None } else { state.last_error },
            checked_at: Utc::now(),
        }
    }
}
