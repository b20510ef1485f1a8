//! `capabilities` subcommand: show the detected capability snapshot.

use serde_json::Value;
use tabled::Tabled;

use unigate_core::{CapabilitySnapshot, Gateway};

use crate::cli::{CapabilitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "FEATURE")]
    feature: String,
    #[tabled(rename = "SUPPORTED")]
    supported: String,
    #[tabled(rename = "MIN VERSION")]
    min_version: String,
    #[tabled(rename = "HARDWARE")]
    hardware: String,
}

pub async fn handle(
    args: CapabilitiesArgs,
    gateway: &Gateway,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot = gateway.capabilities(args.refresh).await?;
    let color = output::should_color(global.color);

    let view = snapshot_view(&snapshot);
    let out = output::render_single(
        global.output,
        &view,
        |_| detail(&snapshot, color),
        |_| {
            snapshot
                .features
                .iter()
                .filter(|(_, gate)| gate.supported)
                .map(|(feature, _)| feature.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Snapshot JSON plus the flat `supports_*` flags.
pub(crate) fn snapshot_view(snapshot: &CapabilitySnapshot) -> Value {
    let mut view = serde_json::to_value(snapshot).unwrap_or(Value::Null);
    if let Value::Object(ref mut map) = view {
        let flags = serde_json::to_value(snapshot.feature_flags()).unwrap_or(Value::Null);
        map.insert("featureFlags".into(), flags);
    }
    view
}

fn detail(snapshot: &CapabilitySnapshot, color: bool) -> String {
    let hw = &snapshot.hardware;
    let header = output::detail_table(&[
        ("Version", snapshot.normalized_version.clone()),
        ("Reported", snapshot.raw_version.clone()),
        ("Model", hw.model.clone()),
        ("Tier", hw.tier.to_string()),
        (
            "Limits",
            format!(
                "{} firewall rules, {} zones, {} networks",
                hw.limits.max_firewall_rules, hw.limits.max_zones, hw.limits.max_networks
            ),
        ),
        ("Deprecated", join_or_dash(snapshot.deprecated_paths.iter())),
        ("Detected", snapshot.detected_at.to_rfc3339()),
    ]);

    let rows: Vec<FeatureRow> = snapshot
        .features
        .iter()
        .map(|(feature, gate)| FeatureRow {
            feature: feature.to_string(),
            supported: output::status_word(
                gate.supported,
                if gate.supported { "yes" } else { "no" },
                color,
            ),
            min_version: gate.min_version.clone(),
            hardware: if gate.compatible_hardware == ["*"] {
                "any".into()
            } else {
                gate.compatible_hardware.join(", ")
            },
        })
        .collect();

    format!(
        "{header}\n\n{}",
        tabled::Table::new(rows).with(tabled::settings::Style::rounded())
    )
}

fn join_or_dash<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let joined = items.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() { "-".into() } else { joined }
}
