// ── Gateway facade ──
//
// Wires config → client → detector → registry → dispatcher. This is the
// one object a protocol front end (CLI, stdio server) needs to hold.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;
use unigate_api::{ConnectionState, HealthReport, RemoteInfo, ResilientClient};

use crate::capability::{CapabilityDetector, CapabilitySnapshot, CapabilityTables};
use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::monitor::HealthMonitor;
use crate::registry::{CatalogEntry, Dispatcher, InvocationResult, RegistryStats, ToolRegistry};
use crate::tools::builtin_operations;

pub struct Gateway {
    config: GatewayConfig,
    client: Arc<ResilientClient>,
    detector: Arc<CapabilityDetector>,
    registry: Arc<ToolRegistry>,
    dispatcher: Dispatcher,
    monitor: Mutex<Option<HealthMonitor>>,
    cancel: CancellationToken,
}

impl Gateway {
    /// Validate `config` and build the full stack with the built-in operations.
    pub fn new(config: GatewayConfig) -> Result<Self, CoreError> {
        Self::with_tables(config, CapabilityTables::default())
    }

    /// Same as [`Gateway::new`] with custom capability tables.
    pub fn with_tables(config: GatewayConfig, tables: CapabilityTables) -> Result<Self, CoreError> {
        let client = Arc::new(ResilientClient::new(config.client_config()?)?);
        let detector = Arc::new(CapabilityDetector::with_tables(
            Arc::clone(&client),
            tables,
            config.capability_ttl,
        ));
        let registry = Arc::new(ToolRegistry::new());
        registry.register_batch(builtin_operations());
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&client),
            Arc::clone(&detector),
        );

        Ok(Self {
            config,
            client,
            detector,
            registry,
            dispatcher,
            monitor: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<ResilientClient> {
        &self.client
    }

    pub fn detector(&self) -> &Arc<CapabilityDetector> {
        &self.detector
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub async fn connect(&self) -> Result<RemoteInfo, CoreError> {
        Ok(self.client.connect().await?)
    }

    /// Idempotent. The capability cache is dropped along with the session.
    pub async fn disconnect(&self) {
        self.client.disconnect().await;
        self.detector.clear_cache();
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.state()
    }

    /// Start the periodic health monitor if an interval is configured.
    /// Returns the report channel; calling it again reuses the running monitor.
    pub async fn start_monitor(&self) -> Option<watch::Receiver<Option<HealthReport>>> {
        let every = self.config.health_check_interval?;
        let mut slot = self.monitor.lock().await;
        if let Some(monitor) = slot.as_ref() {
            return Some(monitor.subscribe());
        }
        info!(interval_secs = every.as_secs(), "starting health monitor");
        let monitor = HealthMonitor::spawn(Arc::clone(&self.client), every, self.cancel.child_token());
        let reports = monitor.subscribe();
        *slot = Some(monitor);
        Some(reports)
    }

    /// Stop the monitor, clear the registry, and disconnect.
    pub async fn shutdown(&self) {
        if let Some(monitor) = self.monitor.lock().await.take() {
            monitor.stop().await;
        }
        self.registry.cleanup();
        self.disconnect().await;
        info!("gateway shut down");
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn list_operations(&self) -> Vec<CatalogEntry> {
        self.dispatcher.list_for_external_catalog().await
    }

    pub async fn invoke(&self, name: &str, args: Value) -> InvocationResult {
        self.dispatcher.invoke(name, args).await
    }

    pub async fn health_check(&self) -> HealthReport {
        self.client.health_check().await
    }

    pub async fn capabilities(&self, refresh: bool) -> Result<Arc<CapabilitySnapshot>, CoreError> {
        if refresh {
            self.detector.force_detection().await
        } else {
            self.detector.detect_capabilities().await
        }
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}
