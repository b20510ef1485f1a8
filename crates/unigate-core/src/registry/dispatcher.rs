// ── Dispatcher ──
//
// Gates invocations behind their preconditions, runs the handler, and
// records statistics. `invoke` never fails: every outcome, including a
// panicking handler, comes back as an `InvocationResult`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use unigate_api::ResilientClient;

use super::catalog::{RegistryEntry, ToolRegistry};
use super::descriptor::{Dependency, OperationDescriptor, ToolContext, validate_input};
use super::result::InvocationResult;
use crate::capability::CapabilityDetector;
use crate::error::CoreError;

/// Catalog entry as exposed to protocol-facing consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<&OperationDescriptor> for CatalogEntry {
    fn from(descriptor: &OperationDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.input_schema.clone(),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    client: Arc<ResilientClient>,
    detector: Arc<CapabilityDetector>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        client: Arc<ResilientClient>,
        detector: Arc<CapabilityDetector>,
    ) -> Self {
        Self {
            registry,
            client,
            detector,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn detector(&self) -> &Arc<CapabilityDetector> {
        &self.detector
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Enabled entries the controller can currently serve. Falls back to
    /// every enabled entry when capability detection fails.
    pub async fn list_available(&self) -> Vec<RegistryEntry> {
        let entries = self.registry.list_all();
        match self.detector.tool_availability(&self.registry).await {
            Ok(availability) => entries
                .into_iter()
                .filter(|e| availability.get(e.name()).is_none_or(|a| a.available))
                .collect(),
            Err(err) => {
                warn!(error = %err, "capability detection failed, listing all enabled operations");
                entries
            }
        }
    }

    /// Full enabled catalog while disconnected, available entries once connected.
    pub async fn list_for_external_catalog(&self) -> Vec<CatalogEntry> {
        let entries = if self.client.is_connected() {
            self.list_available().await
        } else {
            self.registry.list_all()
        };
        entries
            .iter()
            .map(|e| CatalogEntry::from(e.descriptor.as_ref()))
            .collect()
    }

    // ── Invocation ───────────────────────────────────────────────────

    pub async fn invoke(&self, name: &str, args: Value) -> InvocationResult {
        let start = Instant::now();

        let entry = match self.check_preconditions(name).await {
            Ok(entry) => entry,
            Err(err) => {
                debug!(operation = name, kind = %err.kind(), "precondition failed");
                return InvocationResult::failed(&err, Vec::new(), elapsed_ms(start));
            }
        };

        let warnings = self.deprecation_warnings(&entry.descriptor).await;
        let outcome = self.execute(&entry.descriptor, args).await;
        let elapsed = start.elapsed();
        self.registry.record_usage(name, elapsed, outcome.is_ok());

        match outcome {
            Ok(data) => {
                info!(operation = name, elapsed_ms = elapsed_ms(start), "operation succeeded");
                InvocationResult::ok(data, warnings, elapsed_ms(start))
            }
            Err(err) => {
                warn!(operation = name, kind = %err.kind(), error = %err, "operation failed");
                InvocationResult::failed(&err, warnings, elapsed_ms(start))
            }
        }
    }

    async fn check_preconditions(&self, name: &str) -> Result<RegistryEntry, CoreError> {
        let entry = self
            .registry
            .entry(name)
            .ok_or_else(|| CoreError::OperationNotFound {
                name: name.to_owned(),
            })?;

        if !entry.enabled {
            return Err(CoreError::OperationDisabled {
                name: name.to_owned(),
            });
        }

        let descriptor = &entry.descriptor;
        if descriptor.requires_connection && !self.client.is_connected() {
            return Err(CoreError::ConnectionRequired {
                name: name.to_owned(),
            });
        }

        if let Some(feature) = descriptor.requires_feature {
            self.detector
                .validate_feature(feature)
                .await
                .map_err(|e| CoreError::FeatureUnavailable {
                    name: name.to_owned(),
                    feature,
                    reason: e.to_string(),
                })?;
        }

        for dependency in &entry.dependencies {
            let result = match dependency {
                Dependency::Connection if self.client.is_connected() => Ok(()),
                Dependency::Connection => Err("no active controller connection".to_owned()),
                Dependency::Feature(f) if Some(*f) == descriptor.requires_feature => Ok(()),
                Dependency::Feature(f) => self
                    .detector
                    .validate_feature(*f)
                    .await
                    .map_err(|e| e.to_string()),
            };
            if let Err(reason) = result {
                return Err(CoreError::DependencyFailed {
                    name: name.to_owned(),
                    dependency: dependency.to_string(),
                    reason,
                });
            }
        }

        Ok(entry)
    }

    async fn execute(&self, descriptor: &OperationDescriptor, args: Value) -> Result<Value, CoreError> {
        validate_input(&descriptor.input_schema, &args)?;

        let ctx = ToolContext {
            client: Arc::clone(&self.client),
            detector: Arc::clone(&self.detector),
        };
        let handler = descriptor.handler();
        let run = async move { handler.call(ctx, args).await };

        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(CoreError::Execution {
                message: format!("handler panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    /// One warning per endpoint the running controller marks deprecated.
    async fn deprecation_warnings(&self, descriptor: &OperationDescriptor) -> Vec<String> {
        if descriptor.endpoints.is_empty() || !self.client.is_connected() {
            return Vec::new();
        }
        match self.detector.detect_capabilities().await {
            Ok(snapshot) => descriptor
                .endpoints
                .iter()
                .filter(|path| snapshot.is_deprecated(path))
                .map(|path| {
                    format!(
                        "endpoint '{path}' is deprecated as of controller version {}",
                        snapshot.normalized_version
                    )
                })
                .collect(),
            Err(err) => {
                debug!(error = %err, "skipping deprecation check");
                Vec::new()
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
