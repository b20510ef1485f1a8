//! `health` subcommand.

use unigate_core::{CoreError, Gateway};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    let report = gateway.health_check().await;
    let color = output::should_color(global.color);

    let out = output::render_single(
        global.output,
        &report,
        |r| {
            output::detail_table(&[
                (
                    "Status",
                    output::status_word(r.is_healthy(), &r.status.to_string(), color),
                ),
                ("Connected", r.connected.to_string()),
                ("Authenticated", r.authenticated.to_string()),
                ("Latency", format!("{} ms", r.latency_ms)),
                ("Version", r.version.clone().unwrap_or_else(|| "-".into())),
                ("Last error", r.last_error.clone().unwrap_or_else(|| "-".into())),
                ("Checked", r.checked_at.to_rfc3339()),
            ])
        },
        |r| r.status.to_string(),
    );
    output::print_output(&out, global.quiet);

    if report.is_healthy() {
        Ok(())
    } else {
        Err(CoreError::ConnectionFailed {
            url: gateway.config().url.to_string(),
            reason: report.last_error.unwrap_or_else(|| "unhealthy".into()),
        }
        .into())
    }
}
