//! `ops` subcommand: list, discover, and invoke registered operations.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use unigate_core::{
    CatalogEntry, Category, Feature, Gateway, InvocationResult, RegistryEntry, RegistryStats,
};

use crate::cli::{GlobalOpts, OpsArgs, OpsCommand};
use crate::error::CliError;
use crate::output;

use super::try_connect;

// ── Views ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OperationSummary {
    name: String,
    description: String,
    category: Category,
    requires_connection: bool,
    required_features: Vec<Feature>,
    usage_count: u64,
    error_count: u64,
    average_latency_ms: f64,
}

impl From<&RegistryEntry> for OperationSummary {
    fn from(entry: &RegistryEntry) -> Self {
        let d = &entry.descriptor;
        Self {
            name: d.name.clone(),
            description: d.description.clone(),
            category: d.category,
            requires_connection: d.requires_connection,
            required_features: d.required_features(),
            usage_count: entry.usage_count,
            error_count: entry.error_count,
            average_latency_ms: entry.average_latency_ms,
        }
    }
}

#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CATEGORY")]
    category: String,
    #[tabled(rename = "CONNECTION")]
    connection: String,
    #[tabled(rename = "FEATURES")]
    features: String,
}

fn operation_row(s: &OperationSummary) -> OperationRow {
    OperationRow {
        name: s.name.clone(),
        category: s.category.to_string(),
        connection: if s.requires_connection { "yes" } else { "no" }.into(),
        features: if s.required_features.is_empty() {
            "-".into()
        } else {
            s.required_features
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        },
    }
}

#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(args: OpsArgs, gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        OpsCommand::List { category } => {
            let entries = match category {
                Some(category) => gateway.registry().list_by_category(category),
                None => gateway.registry().list_all(),
            };
            print_operations(&entries, global);
            Ok(())
        }

        OpsCommand::Available => {
            gateway.connect().await?;
            let entries = gateway.dispatcher().list_available().await;
            print_operations(&entries, global);
            Ok(())
        }

        OpsCommand::Catalog => {
            try_connect(gateway).await;
            let catalog = gateway.list_operations().await;
            let out = output::render_list(
                global.output,
                &catalog,
                |e: &CatalogEntry| CatalogRow {
                    name: e.name.clone(),
                    description: e.description.clone(),
                },
                |e| e.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        OpsCommand::Stats => {
            let stats = gateway.stats();
            let out = output::render_single(global.output, &stats, stats_detail, |s| {
                s.total_invocations.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        OpsCommand::Call {
            name,
            args,
            args_file,
        } => {
            let arguments = read_arguments(args.as_deref(), args_file.as_deref())?;
            try_connect(gateway).await;
            let result = gateway.invoke(&name, arguments).await;
            print_invocation(&result, global);

            match result.error {
                None => Ok(()),
                Some(error) => Err(CliError::OperationFailed {
                    code: error.code,
                    message: error.message,
                }),
            }
        }
    }
}

fn print_operations(entries: &[RegistryEntry], global: &GlobalOpts) {
    let summaries: Vec<OperationSummary> = entries.iter().map(OperationSummary::from).collect();
    let out = output::render_list(global.output, &summaries, operation_row, |s| s.name.clone());
    output::print_output(&out, global.quiet);
}

fn stats_detail(stats: &RegistryStats) -> String {
    let by_category = stats
        .by_category
        .iter()
        .map(|(category, count)| format!("{category}={count}"))
        .collect::<Vec<_>>()
        .join(" ");
    output::detail_table(&[
        ("Operations", stats.total_operations.to_string()),
        ("Enabled", stats.enabled_operations.to_string()),
        ("Disabled", stats.disabled_operations.to_string()),
        ("By category", by_category),
        ("Invocations", stats.total_invocations.to_string()),
        ("Errors", stats.total_errors.to_string()),
        ("Avg latency", format!("{:.1} ms", stats.average_latency_ms)),
    ])
}

fn print_invocation(result: &InvocationResult, global: &GlobalOpts) {
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        result,
        |r| invocation_detail(r, color),
        |r| match r.data {
            Some(ref data) => plain_value(data),
            None => r.error_message().unwrap_or_default().to_owned(),
        },
    );
    output::print_output(&out, global.quiet);
}

fn invocation_detail(result: &InvocationResult, color: bool) -> String {
    let status = output::status_word(
        result.success,
        if result.success { "success" } else { "failed" },
        color,
    );
    let mut rows = vec![
        ("Status", status),
        (
            "Duration",
            format!("{} ms", result.metadata.execution_time_ms),
        ),
    ];
    if let Some(ref error) = result.error {
        rows.push(("Error", format!("{}: {}", error.code, error.message)));
    }
    for warning in &result.warnings {
        rows.push(("Warning", warning.clone()));
    }
    let mut out = output::detail_table(&rows);
    if let Some(ref data) = result.data {
        out.push_str("\n\n");
        out.push_str(&serde_json::to_string_pretty(data).unwrap_or_default());
    }
    out
}

/// One line per array element; scalars as-is.
fn plain_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(plain_scalar).collect::<Vec<_>>().join("\n"),
        other => plain_scalar(other),
    }
}

fn plain_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["name", "mac", "_id", "id"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str))
            .map_or_else(|| value.to_string(), str::to_owned),
        other => other.to_string(),
    }
}

/// `--args` JSON, `--args-file` contents, or an empty object.
fn read_arguments(inline: Option<&str>, file: Option<&Path>) -> Result<Value, CliError> {
    let raw = match (inline, file) {
        (Some(inline), _) => inline.to_owned(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => return Ok(Value::Object(serde_json::Map::new())),
    };
    let value: Value = serde_json::from_str(&raw)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(CliError::Validation {
            field: "args".into(),
            reason: "arguments must be a JSON object".into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn arguments_from_flag_or_file() {
        assert_eq!(read_arguments(None, None).unwrap(), json!({}));
        assert_eq!(
            read_arguments(Some(r#"{"mac":"aa:bb:cc:dd:ee:ff"}"#), None).unwrap(),
            json!({ "mac": "aa:bb:cc:dd:ee:ff" })
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"limit": 5}"#).unwrap();
        assert_eq!(read_arguments(None, Some(file.path())).unwrap(), json!({ "limit": 5 }));
    }

    #[test]
    fn non_object_arguments_are_usage_errors() {
        let err = read_arguments(Some("[1,2]"), None).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
        assert!(matches!(read_arguments(Some("{"), None), Err(CliError::Json(_))));
    }

    #[test]
    fn plain_rendering_picks_identifiers() {
        let data = json!([{ "name": "UDM", "mac": "aa" }, { "mac": "bb" }, "x", 3]);
        assert_eq!(plain_value(&data), "UDM\nbb\nx\n3");
    }
}
