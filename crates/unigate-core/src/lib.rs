//! Capability detection, tool registry and dispatch between `unigate-api`
//! and protocol front ends.
//!
//! - **[`Gateway`]**: Facade owning the whole stack: a shared
//!   [`ResilientClient`](unigate_api::ResilientClient), the
//!   [`CapabilityDetector`], the [`ToolRegistry`] with the built-in
//!   operations, and the [`Dispatcher`].
//!
//! - **[`CapabilityDetector`]**: Turns one sysinfo probe into an immutable
//!   [`CapabilitySnapshot`] (feature gates, supported and deprecated
//!   paths, tiered hardware limits), cached for a validity window.
//!
//! - **[`Dispatcher`]**: Runs the invocation state machine. `invoke`
//!   always returns an [`InvocationResult`]; failures carry an
//!   [`ErrorKind`] code.

pub mod capability;
pub mod config;
pub mod error;
pub mod gateway;
pub mod monitor;
pub mod registry;
pub mod tools;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use capability::{
    CapabilityDetector, CapabilitySnapshot, CapabilityTables, Feature, HardwareTier,
    OperationAvailability,
};
pub use config::{GatewayConfig, TlsVerification};
pub use error::{CoreError, ErrorKind};
pub use gateway::Gateway;
pub use monitor::HealthMonitor;
pub use registry::{
    CatalogEntry, Category, Dependency, Dispatcher, InvocationResult, OperationDescriptor,
    RegistryEntry, RegistryStats, ToolContext, ToolHandler, ToolRegistry,
};
pub use tools::builtin_operations;
pub use version::{compare_versions, is_at_least, normalize_version};
