// ── Capability tables ──
//
// Vendor data driving version/hardware gating: which feature needs which
// firmware and hardware, which endpoints exist in which release, and how
// hardware tiers scale resource limits.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use unigate_api::SYSINFO_PATH;

// ── Features ─────────────────────────────────────────────────────────

/// Named remote features an operation may depend on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Zone-based firewall (zones + policies), Network 9.0+ on gateways.
    ZoneBasedFirewall,
    /// Classic rule-based firewall. Deprecated in 9.0 but still served.
    LegacyFirewall,
    /// Policy-based traffic routes.
    TrafficRoutes,
    /// Traffic flow inspection.
    TrafficFlows,
    /// Official Integration API under `/integration/v1`.
    IntegrationApi,
    /// WireGuard VPN server.
    WireguardVpn,
    /// Content filtering profiles.
    ContentFiltering,
}

/// Which hardware models qualify for a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareSet {
    /// Wildcard: all hardware qualifies.
    Any,
    Models(Vec<String>),
}

impl HardwareSet {
    pub fn models(models: &[&str]) -> Self {
        Self::Models(models.iter().map(|m| (*m).to_owned()).collect())
    }

    /// Model names are compared case-insensitively, ignoring `-`, `_` and spaces,
    /// so `UDM-Pro`, `UDMPRO` and `udm pro` are the same device.
    pub fn contains(&self, model: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Models(models) => {
                let wanted = canonical_model(model);
                models.iter().any(|m| canonical_model(m) == wanted)
            }
        }
    }

    /// Human-readable list for error messages.
    pub fn describe(&self) -> Vec<String> {
        match self {
            Self::Any => vec!["*".to_owned()],
            Self::Models(models) => models.clone(),
        }
    }
}

pub(crate) fn canonical_model(model: &str) -> String {
    model
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Version and hardware gate for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRequirement {
    pub feature: Feature,
    pub min_version: String,
    pub hardware: HardwareSet,
    /// Operation to suggest when the feature is unavailable.
    pub alternative: Option<String>,
}

impl FeatureRequirement {
    pub fn new(feature: Feature, min_version: &str, hardware: HardwareSet) -> Self {
        Self {
            feature,
            min_version: min_version.to_owned(),
            hardware,
            alternative: None,
        }
    }

    pub fn with_alternative(mut self, operation: &str) -> Self {
        self.alternative = Some(operation.to_owned());
        self
    }
}

// ── Endpoints ────────────────────────────────────────────────────────

/// Lifecycle of one addressable path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub path: String,
    pub introduced_in: String,
    pub deprecated_in: Option<String>,
}

impl EndpointSpec {
    pub fn new(path: &str, introduced_in: &str) -> Self {
        Self {
            path: path.to_owned(),
            introduced_in: introduced_in.to_owned(),
            deprecated_in: None,
        }
    }

    pub fn deprecated_in(mut self, version: &str) -> Self {
        self.deprecated_in = Some(version.to_owned());
        self
    }
}

// ── Hardware tiers & limits ──────────────────────────────────────────

/// Hardware tier, scaling the base resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum HardwareTier {
    Entry,
    Standard,
    Enterprise,
}

impl HardwareTier {
    pub fn multiplier(self) -> u32 {
        match self {
            Self::Entry => 1,
            Self::Standard => 2,
            Self::Enterprise => 4,
        }
    }
}

/// Resource limits for a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    pub max_firewall_rules: u32,
    pub max_zones: u32,
    pub max_networks: u32,
}

impl Limits {
    pub fn scaled(self, factor: u32) -> Self {
        Self {
            max_firewall_rules: self.max_firewall_rules.saturating_mul(factor),
            max_zones: self.max_zones.saturating_mul(factor),
            max_networks: self.max_networks.saturating_mul(factor),
        }
    }
}

// ── Table bundle ─────────────────────────────────────────────────────

/// All gating data consulted when a snapshot is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTables {
    pub features: Vec<FeatureRequirement>,
    pub endpoints: Vec<EndpointSpec>,
    pub standard_models: Vec<String>,
    pub enterprise_models: Vec<String>,
    pub base_limits: Limits,
    /// At or past this version, limits double.
    pub limit_doubling_version: String,
}

impl CapabilityTables {
    pub fn requirement(&self, feature: Feature) -> Option<&FeatureRequirement> {
        self.features.iter().find(|r| r.feature == feature)
    }

    pub fn tier_for(&self, model: &str) -> HardwareTier {
        let wanted = canonical_model(model);
        let in_list = |list: &[String]| list.iter().any(|m| canonical_model(m) == wanted);
        if in_list(&self.enterprise_models) {
            HardwareTier::Enterprise
        } else if in_list(&self.standard_models) {
            HardwareTier::Standard
        } else {
            HardwareTier::Entry
        }
    }
}

const GATEWAYS: &[&str] = &[
    "UDM", "UDM-Pro", "UDM-SE", "UDM-Pro-Max", "UDR", "UDR7", "UDW", "UCG-Ultra", "UCG-Max",
    "UCG-Fiber", "UXG-Lite", "UXG-Pro", "UXG-Max", "UXG-Enterprise", "EFG",
];

impl Default for CapabilityTables {
    fn default() -> Self {
        let strings = |list: &[&str]| list.iter().map(|m| (*m).to_owned()).collect();
        Self {
            features: vec![
                FeatureRequirement::new(
                    Feature::ZoneBasedFirewall,
                    "9.0.0",
                    HardwareSet::models(GATEWAYS),
                )
                .with_alternative("unifi_list_firewall_rules"),
                FeatureRequirement::new(Feature::LegacyFirewall, "5.0.0", HardwareSet::Any),
                FeatureRequirement::new(Feature::TrafficRoutes, "8.0.0", HardwareSet::Any),
                FeatureRequirement::new(Feature::TrafficFlows, "9.1.0", HardwareSet::Any),
                FeatureRequirement::new(Feature::IntegrationApi, "9.0.0", HardwareSet::Any),
                FeatureRequirement::new(
                    Feature::WireguardVpn,
                    "7.4.0",
                    HardwareSet::models(GATEWAYS),
                ),
                FeatureRequirement::new(
                    Feature::ContentFiltering,
                    "8.2.0",
                    HardwareSet::models(GATEWAYS),
                ),
            ],
            endpoints: vec![
                EndpointSpec::new(SYSINFO_PATH, "5.0.0"),
                EndpointSpec::new("api/s/{site}/stat/device", "5.0.0"),
                EndpointSpec::new("api/s/{site}/cmd/devmgr", "5.0.0"),
                EndpointSpec::new("api/s/{site}/stat/sta", "5.0.0"),
                EndpointSpec::new("api/s/{site}/rest/networkconf", "5.0.0"),
                EndpointSpec::new("api/s/{site}/rest/firewallrule", "5.0.0").deprecated_in("9.0.0"),
                EndpointSpec::new("api/s/{site}/rest/firewallgroup", "5.0.0")
                    .deprecated_in("9.0.0"),
                EndpointSpec::new("v2/api/site/{site}/trafficroutes", "8.0.0"),
                EndpointSpec::new("v2/api/site/{site}/firewall/zone", "9.0.0"),
                EndpointSpec::new("v2/api/site/{site}/firewall-policies", "9.0.0"),
                EndpointSpec::new("v2/api/site/{site}/traffic-flows", "9.1.0"),
                EndpointSpec::new("integration/v1/sites", "9.0.0"),
            ],
            standard_models: strings(&["UDM-Pro", "UCG-Max", "UXG-Pro", "UXG-Max", "UCG-Fiber"]),
            enterprise_models: strings(&["UDM-SE", "UDM-Pro-Max", "UXG-Enterprise", "EFG", "UDW"]),
            base_limits: Limits {
                max_firewall_rules: 250,
                max_zones: 10,
                max_networks: 32,
            },
            limit_doubling_version: "9.1.0".to_owned(),
        }
    }
}
