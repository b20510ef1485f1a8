// ── Capability detector ──
//
// Probes the controller once per validity window and caches the snapshot.
// Concurrent cache misses collapse into a single in-flight probe.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use unigate_api::ResilientClient;

use super::snapshot::{CapabilitySnapshot, OperationAvailability};
use super::tables::{CapabilityTables, Feature};
use crate::error::CoreError;
use crate::registry::ToolRegistry;

/// Default snapshot validity window.
pub const DEFAULT_CAPABILITY_TTL: Duration = Duration::from_secs(60 * 60);

struct Cached {
    snapshot: Arc<CapabilitySnapshot>,
    fetched_at: Instant,
}

pub struct CapabilityDetector {
    client: Arc<ResilientClient>,
    tables: CapabilityTables,
    ttl: Duration,
    cache: ArcSwapOption<Cached>,
    refresh: Mutex<()>,
    probes: AtomicU64,
}

impl CapabilityDetector {
    pub fn new(client: Arc<ResilientClient>) -> Self {
        Self::with_tables(client, CapabilityTables::default(), DEFAULT_CAPABILITY_TTL)
    }

    pub fn with_tables(client: Arc<ResilientClient>, tables: CapabilityTables, ttl: Duration) -> Self {
        Self {
            client,
            tables,
            ttl,
            cache: ArcSwapOption::empty(),
            refresh: Mutex::new(()),
            probes: AtomicU64::new(0),
        }
    }

    pub fn tables(&self) -> &CapabilityTables {
        &self.tables
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of probes issued so far.
    pub fn probe_count(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    /// The cached snapshot if it is still within the validity window.
    pub fn cached(&self) -> Option<Arc<CapabilitySnapshot>> {
        self.cache
            .load()
            .as_ref()
            .filter(|c| c.fetched_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.snapshot))
    }

    /// Cached snapshot, or a fresh probe when the cache is empty or stale.
    pub async fn detect_capabilities(&self) -> Result<Arc<CapabilitySnapshot>, CoreError> {
        if let Some(snapshot) = self.cached() {
            return Ok(snapshot);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(snapshot) = self.cached() {
            return Ok(snapshot);
        }
        self.probe().await
    }

    /// Rebuild the snapshot now, ignoring the validity window.
    pub async fn force_detection(&self) -> Result<Arc<CapabilitySnapshot>, CoreError> {
        let _guard = self.refresh.lock().await;
        self.probe().await
    }

    pub fn clear_cache(&self) {
        debug!("clearing capability cache");
        self.cache.store(None);
    }

    /// Fails with `FeatureNotSupported` unless `feature` is usable.
    pub async fn validate_feature(&self, feature: Feature) -> Result<(), CoreError> {
        self.detect_capabilities().await?.validate_feature(feature)
    }

    /// Fails with `HardwareIncompatible` if the hardware gate for `feature` fails.
    pub async fn validate_hardware_compatibility(&self, feature: Feature) -> Result<(), CoreError> {
        self.detect_capabilities().await?.validate_hardware(feature)
    }

    /// Availability of every enabled operation in `registry`.
    pub async fn tool_availability(
        &self,
        registry: &ToolRegistry,
    ) -> Result<BTreeMap<String, OperationAvailability>, CoreError> {
        let snapshot = self.detect_capabilities().await?;
        Ok(registry
            .list_all()
            .into_iter()
            .map(|entry| {
                let features = entry.descriptor.required_features();
                (entry.descriptor.name.clone(), snapshot.availability(&features))
            })
            .collect())
    }

    async fn probe(&self) -> Result<Arc<CapabilitySnapshot>, CoreError> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let info = self
            .client
            .get_system_info()
            .await
            .map_err(|e| CoreError::CapabilityDetection {
                reason: e.to_string(),
            })?;

        let snapshot = Arc::new(CapabilitySnapshot::build(&info, &self.tables));
        info!(
            version = %snapshot.normalized_version,
            model = %snapshot.hardware.model,
            tier = %snapshot.hardware.tier,
            "capabilities detected"
        );
        self.cache.store(Some(Arc::new(Cached {
            snapshot: Arc::clone(&snapshot),
            fetched_at: Instant::now(),
        })));
        Ok(snapshot)
    }
}
