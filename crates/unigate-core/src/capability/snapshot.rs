// ── Capability snapshot ──
//
// Immutable description of what the controller supports, derived from one
// sysinfo probe and the capability tables. Replaced wholesale on re-detection.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use unigate_api::SystemInfo;

use super::tables::{CapabilityTables, Feature, HardwareTier, Limits};
use crate::error::CoreError;
use crate::version::{is_at_least, normalize_version};

/// Outcome of the version and hardware gates for one feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureGate {
    pub supported: bool,
    pub version_ok: bool,
    pub hardware_ok: bool,
    pub min_version: String,
    pub compatible_hardware: Vec<String>,
    pub alternative: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub model: String,
    pub tier: HardwareTier,
    pub limits: Limits,
}

/// Whether an operation can currently run, and if not, why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationAvailability {
    pub available: bool,
    pub reason: Option<String>,
    pub alternative: Option<String>,
    pub minimum_version_required: Option<String>,
}

impl OperationAvailability {
    pub fn available() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    pub raw_version: String,
    pub normalized_version: String,
    pub features: BTreeMap<Feature, FeatureGate>,
    /// Every path introduced at or before the running version. Deprecated
    /// paths stay here; they are still callable.
    pub supported_paths: BTreeSet<String>,
    pub deprecated_paths: BTreeSet<String>,
    pub hardware: HardwareProfile,
    pub detected_at: DateTime<Utc>,
}

impl CapabilitySnapshot {
    /// Derive a snapshot from a sysinfo record.
    pub fn build(info: &SystemInfo, tables: &CapabilityTables) -> Self {
        let version = normalize_version(&info.version);
        let model = info.model.clone().unwrap_or_else(|| "unknown".to_owned());

        let features = tables
            .features
            .iter()
            .map(|req| {
                let version_ok = is_at_least(&version, &req.min_version);
                let hardware_ok = req.hardware.contains(&model);
                let gate = FeatureGate {
                    supported: version_ok && hardware_ok,
                    version_ok,
                    hardware_ok,
                    min_version: req.min_version.clone(),
                    compatible_hardware: req.hardware.describe(),
                    alternative: req.alternative.clone(),
                };
                (req.feature, gate)
            })
            .collect();

        let mut supported_paths = BTreeSet::new();
        let mut deprecated_paths = BTreeSet::new();
        for endpoint in &tables.endpoints {
            if !is_at_least(&version, &endpoint.introduced_in) {
                continue;
            }
            supported_paths.insert(endpoint.path.clone());
            if endpoint
                .deprecated_in
                .as_deref()
                .is_some_and(|v| is_at_least(&version, v))
            {
                deprecated_paths.insert(endpoint.path.clone());
            }
        }

        let tier = tables.tier_for(&model);
        let mut limits = tables.base_limits.scaled(tier.multiplier());
        if is_at_least(&version, &tables.limit_doubling_version) {
            limits = limits.scaled(2);
        }

        Self {
            raw_version: info.version.clone(),
            normalized_version: version,
            features,
            supported_paths,
            deprecated_paths,
            hardware: HardwareProfile {
                model,
                tier,
                limits,
            },
            detected_at: Utc::now(),
        }
    }

    pub fn gate(&self, feature: Feature) -> Option<&FeatureGate> {
        self.features.get(&feature)
    }

    /// Features missing from the tables are unsupported.
    pub fn is_supported(&self, feature: Feature) -> bool {
        self.gate(feature).is_some_and(|g| g.supported)
    }

    /// Flags keyed `supports_<feature>`.
    pub fn feature_flags(&self) -> BTreeMap<String, bool> {
        self.features
            .iter()
            .map(|(feature, gate)| (format!("supports_{feature}"), gate.supported))
            .collect()
    }

    pub fn supports_path(&self, path: &str) -> bool {
        self.supported_paths.contains(path)
    }

    pub fn is_deprecated(&self, path: &str) -> bool {
        self.deprecated_paths.contains(path)
    }

    /// Fails with `FeatureNotSupported` unless both gates pass. The
    /// reason names whichever gate failed first.
    pub fn validate_feature(&self, feature: Feature) -> Result<(), CoreError> {
        let (required_version, reason) = match self.gate(feature) {
            Some(gate) if gate.supported => return Ok(()),
            Some(gate) if !gate.version_ok => (
                gate.min_version.clone(),
                format!(
                    "requires version {} (controller runs {})",
                    gate.min_version, self.normalized_version
                ),
            ),
            Some(gate) => (
                gate.min_version.clone(),
                format!(
                    "not available on {} (compatible: {})",
                    self.hardware.model,
                    gate.compatible_hardware.join(", ")
                ),
            ),
            None => ("unknown".to_owned(), "unknown to this controller".to_owned()),
        };
        Err(CoreError::FeatureNotSupported {
            feature,
            required_version,
            current_version: self.normalized_version.clone(),
            reason,
        })
    }

    /// Fails with `HardwareIncompatible` if the hardware gate fails.
    pub fn validate_hardware(&self, feature: Feature) -> Result<(), CoreError> {
        match self.gate(feature) {
            Some(gate) if !gate.hardware_ok => Err(CoreError::HardwareIncompatible {
                feature,
                model: self.hardware.model.clone(),
                compatible: gate.compatible_hardware.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Availability of an operation needing all of `features`. The first
    /// failing gate explains the result.
    pub fn availability(&self, features: &[Feature]) -> OperationAvailability {
        for &feature in features {
            let Some(gate) = self.gate(feature) else {
                return OperationAvailability {
                    available: false,
                    reason: Some(format!("feature '{feature}' is unknown to this controller")),
                    ..OperationAvailability::default()
                };
            };
            if !gate.version_ok {
                return OperationAvailability {
                    available: false,
                    reason: Some(format!(
                        "'{feature}' requires version {} (running {})",
                        gate.min_version, self.normalized_version
                    )),
                    alternative: gate.alternative.clone(),
                    minimum_version_required: Some(gate.min_version.clone()),
                };
            }
            if !gate.hardware_ok {
                return OperationAvailability {
                    available: false,
                    reason: Some(format!(
                        "'{feature}' is not supported on {}",
                        self.hardware.model
                    )),
                    alternative: gate.alternative.clone(),
                    minimum_version_required: None,
                };
            }
        }
        OperationAvailability::available()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::capability::tables::{EndpointSpec, FeatureRequirement, HardwareSet};

    fn info(version: &str, model: &str) -> SystemInfo {
        SystemInfo::from_value(&json!({ "version": version, "model": model }))
    }

    fn gated_tables() -> CapabilityTables {
        CapabilityTables {
            features: vec![FeatureRequirement::new(
                Feature::ZoneBasedFirewall,
                "9.0.0",
                HardwareSet::models(&["ModelA", "ModelB"]),
            )],
            ..CapabilityTables::default()
        }
    }

    #[test]
    fn version_and_hardware_gates() {
        let tables = gated_tables();

        let old = CapabilitySnapshot::build(&info("8.9.0", "ModelA"), &tables);
        assert!(!old.is_supported(Feature::ZoneBasedFirewall));

        let wrong_hw = CapabilitySnapshot::build(&info("9.1.0", "ModelC"), &tables);
        assert!(!wrong_hw.is_supported(Feature::ZoneBasedFirewall));

        let ok = CapabilitySnapshot::build(&info("9.0.0", "ModelA"), &tables);
        assert!(ok.is_supported(Feature::ZoneBasedFirewall));
    }

    #[test]
    fn validation_errors_carry_context() {
        let tables = gated_tables();
        let old = CapabilitySnapshot::build(&info("8.9.0", "ModelA"), &tables);
        match old.validate_feature(Feature::ZoneBasedFirewall) {
            Err(CoreError::FeatureNotSupported {
                required_version,
                current_version,
                ..
            }) => {
                assert_eq!(required_version, "9.0.0");
                assert_eq!(current_version, "8.9.0");
            }
            other => panic!("expected FeatureNotSupported, got {other:?}"),
        }
        assert!(old.validate_hardware(Feature::ZoneBasedFirewall).is_ok());

        let wrong_hw = CapabilitySnapshot::build(&info("9.1.0", "ModelC"), &tables);
        match wrong_hw.validate_hardware(Feature::ZoneBasedFirewall) {
            Err(CoreError::HardwareIncompatible {
                model, compatible, ..
            }) => {
                assert_eq!(model, "ModelC");
                assert_eq!(compatible, vec!["ModelA", "ModelB"]);
            }
            other => panic!("expected HardwareIncompatible, got {other:?}"),
        }
    }

    #[test]
    fn feature_error_names_the_failing_gate() {
        let tables = gated_tables();

        let old = CapabilitySnapshot::build(&info("8.9.0", "ModelA"), &tables);
        let message = old.validate_feature(Feature::ZoneBasedFirewall).unwrap_err().to_string();
        assert!(message.contains("requires version 9.0.0"), "{message}");

        let wrong_hw = CapabilitySnapshot::build(&info("9.1.0", "ModelC"), &tables);
        let err = wrong_hw.validate_feature(Feature::ZoneBasedFirewall).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not available on ModelC"), "{message}");
        assert!(!message.contains("requires version"), "{message}");
        assert_eq!(
            err.details().unwrap()["reason"],
            json!("not available on ModelC (compatible: ModelA, ModelB)")
        );
    }

    #[test]
    fn wildcard_hardware_always_passes() {
        let snapshot =
            CapabilitySnapshot::build(&info("9.0.0", "Anything"), &CapabilityTables::default());
        assert!(snapshot.validate_hardware(Feature::TrafficRoutes).is_ok());
        assert!(snapshot.is_supported(Feature::TrafficRoutes));
    }

    #[test]
    fn deprecated_paths_remain_supported() {
        let tables = CapabilityTables {
            endpoints: vec![
                EndpointSpec::new("api/s/{site}/rest/firewallrule", "5.0.0").deprecated_in("9.0.0"),
                EndpointSpec::new("v2/api/site/{site}/firewall/zone", "9.0.0"),
            ],
            ..CapabilityTables::default()
        };

        let old = CapabilitySnapshot::build(&info("8.1.0", "UDM"), &tables);
        assert!(old.supports_path("api/s/{site}/rest/firewallrule"));
        assert!(!old.is_deprecated("api/s/{site}/rest/firewallrule"));
        assert!(!old.supports_path("v2/api/site/{site}/firewall/zone"));

        let new = CapabilitySnapshot::build(&info("9.0.30", "UDM"), &tables);
        assert!(new.supports_path("api/s/{site}/rest/firewallrule"));
        assert!(new.is_deprecated("api/s/{site}/rest/firewallrule"));
        assert!(new.supports_path("v2/api/site/{site}/firewall/zone"));
    }

    #[test]
    fn tiered_limits_double_past_threshold() {
        let tables = CapabilityTables::default();

        let entry = CapabilitySnapshot::build(&info("9.0.0", "UDR"), &tables);
        assert_eq!(entry.hardware.tier, HardwareTier::Entry);
        assert_eq!(entry.hardware.limits.max_firewall_rules, 250);

        let standard = CapabilitySnapshot::build(&info("9.0.0", "UDMPRO"), &tables);
        assert_eq!(standard.hardware.limits.max_zones, 20);

        let enterprise = CapabilitySnapshot::build(&info("9.1.120", "UDM-SE"), &tables);
        assert_eq!(enterprise.hardware.tier, HardwareTier::Enterprise);
        assert_eq!(enterprise.hardware.limits.max_networks, 32 * 4 * 2);
    }

    #[test]
    fn normalizes_suffixed_versions() {
        let snapshot = CapabilitySnapshot::build(
            &info("v9.0.114-beta.2", "UDM"),
            &CapabilityTables::default(),
        );
        assert_eq!(snapshot.raw_version, "v9.0.114-beta.2");
        assert_eq!(snapshot.normalized_version, "9.0.114");
        assert_eq!(
            snapshot.feature_flags().get("supports_zone_based_firewall"),
            Some(&true)
        );
    }

    #[test]
    fn availability_explains_failures() {
        let snapshot = CapabilitySnapshot::build(&info("8.2.93", "UDM"), &CapabilityTables::default());
        let availability = snapshot.availability(&[Feature::ZoneBasedFirewall]);
        assert!(!availability.available);
        assert_eq!(availability.minimum_version_required.as_deref(), Some("9.0.0"));
        assert_eq!(
            availability.alternative.as_deref(),
            Some("unifi_list_firewall_rules")
        );
        assert!(snapshot.availability(&[]).available);
    }
}
