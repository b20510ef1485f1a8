// ── Tool registry ──
//
// Concurrent catalog of operations with per-entry runtime statistics.
// Lookups only ever see enabled entries; `entry()` exposes disabled ones
// for the dispatcher's precondition checks.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use super::descriptor::{Category, Dependency, OperationDescriptor};

/// A descriptor plus its mutable runtime state.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub descriptor: Arc<OperationDescriptor>,
    pub enabled: bool,
    pub registered_at: DateTime<Utc>,
    pub usage_count: u64,
    pub error_count: u64,
    /// Running mean over `usage_count` samples.
    pub average_latency_ms: f64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub dependencies: Vec<Dependency>,
}

impl RegistryEntry {
    fn new(descriptor: OperationDescriptor) -> Self {
        let dependencies = descriptor.dependencies();
        Self {
            descriptor: Arc::new(descriptor),
            enabled: true,
            registered_at: Utc::now(),
            usage_count: 0,
            error_count: 0,
            average_latency_ms: 0.0,
            last_used_at: None,
            dependencies,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    #[allow(clippy::cast_precision_loss)]
    fn record(&mut self, latency: Duration, success: bool) {
        self.usage_count += 1;
        let n = self.usage_count as f64;
        let sample = latency.as_secs_f64() * 1000.0;
        self.average_latency_ms = (self.average_latency_ms * (n - 1.0) + sample) / n;
        if !success {
            self.error_count += 1;
        }
        self.last_used_at = Some(Utc::now());
    }
}

/// Aggregate counters over the whole registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total_operations: usize,
    pub enabled_operations: usize,
    pub disabled_operations: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub total_invocations: u64,
    pub total_errors: u64,
    /// `Σ(avg_i × usage_i) / Σ usage_i`, zero without usage.
    pub average_latency_ms: f64,
}

#[derive(Default)]
pub struct ToolRegistry {
    entries: DashMap<String, RegistryEntry>,
    by_category: DashMap<Category, BTreeSet<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replacement starts with fresh statistics and
    /// moves to the new descriptor's category.
    pub fn register(&self, descriptor: OperationDescriptor) {
        let name = descriptor.name.clone();
        let category = descriptor.category;
        let previous = self.entries.insert(name.clone(), RegistryEntry::new(descriptor));

        if let Some(old) = previous {
            debug!(operation = %name, "replacing registered operation");
            if old.descriptor.category != category {
                self.unindex(old.descriptor.category, &name);
            }
        }
        self.by_category.entry(category).or_default().insert(name);
    }

    pub fn register_batch(&self, descriptors: impl IntoIterator<Item = OperationDescriptor>) {
        for descriptor in descriptors {
            self.register(descriptor);
        }
    }

    /// Returns `false` if `name` was not registered.
    pub fn unregister(&self, name: &str) -> bool {
        match self.entries.remove(name) {
            Some((_, entry)) => {
                self.unindex(entry.descriptor.category, name);
                true
            }
            None => false,
        }
    }

    /// Returns `false` if `name` was not registered.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.entries.get_mut(name) {
            Some(mut entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Enabled entry by name.
    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        self.entry(name).filter(|e| e.enabled)
    }

    /// Entry by name, enabled or not.
    pub fn entry(&self, name: &str) -> Option<RegistryEntry> {
        self.entries.get(name).map(|e| e.value().clone())
    }

    /// Enabled entries, sorted by name.
    pub fn list_all(&self) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self
            .entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by(|a, b| a.descriptor.name.cmp(&b.descriptor.name));
        entries
    }

    /// Enabled entries in `category`, sorted by name.
    pub fn list_by_category(&self, category: Category) -> Vec<RegistryEntry> {
        let names: Vec<String> = self
            .by_category
            .get(&category)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.iter().filter_map(|name| self.get(name)).collect()
    }

    /// Record one completed invocation. Unknown names are ignored.
    pub fn record_usage(&self, name: &str, latency: Duration, success: bool) {
        if let Some(mut entry) = self.entries.get_mut(name) {
            entry.record(latency, success);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total_operations: 0,
            enabled_operations: 0,
            disabled_operations: 0,
            by_category: BTreeMap::new(),
            total_invocations: 0,
            total_errors: 0,
            average_latency_ms: 0.0,
        };
        let mut weighted = 0.0;

        for entry in &self.entries {
            stats.total_operations += 1;
            if entry.enabled {
                stats.enabled_operations += 1;
            } else {
                stats.disabled_operations += 1;
            }
            *stats.by_category.entry(entry.descriptor.category).or_default() += 1;
            stats.total_invocations += entry.usage_count;
            stats.total_errors += entry.error_count;
            weighted += entry.average_latency_ms * entry.usage_count as f64;
        }

        if stats.total_invocations > 0 {
            stats.average_latency_ms = weighted / stats.total_invocations as f64;
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop everything. Used on shutdown.
    pub fn cleanup(&self) {
        self.entries.clear();
        self.by_category.clear();
    }

    fn unindex(&self, category: Category, name: &str) {
        if let Some(mut names) = self.by_category.get_mut(&category) {
            names.remove(name);
        }
        self.by_category.remove_if(&category, |_, names| names.is_empty());
    }
}
