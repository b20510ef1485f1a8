// Capability detection: version/hardware gating over a cached snapshot.

mod detector;
mod snapshot;
mod tables;

pub use detector::{CapabilityDetector, DEFAULT_CAPABILITY_TTL};
pub use snapshot::{CapabilitySnapshot, FeatureGate, HardwareProfile, OperationAvailability};
pub use tables::{
    CapabilityTables, EndpointSpec, Feature, FeatureRequirement, HardwareSet, HardwareTier, Limits,
};
