// unigate-api: resilient async client for the UniFi Network application API

pub mod auth;
pub mod client;
pub mod envelope;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod system;
pub mod transport;

pub use auth::ControllerPlatform;
pub use client::{ApiRequest, ClientConfig, ConnectionState, RemoteInfo, ResilientClient, SYSINFO_PATH};
pub use envelope::{Envelope, Meta, ResponseCode};
pub use error::{ConnectFailure, Error};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::RetryConfig;
pub use system::{HealthReport, HealthStatus, SystemInfo};
pub use transport::{HttpTransport, TlsMode, TransportConfig, TransportRequest, TransportResponse};
