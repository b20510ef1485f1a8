//! Command dispatch: routes parsed CLI commands to their handlers.

pub mod capabilities;
pub mod config_cmd;
pub mod health;
pub mod ops;
pub mod serve;

use unigate_core::Gateway;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a controller-backed command to its handler.
pub async fn dispatch(cmd: Command, gateway: &Gateway, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Ops(args) => ops::handle(args, gateway, global).await,
        Command::Capabilities(args) => capabilities::handle(args, gateway, global).await,
        Command::Health => health::handle(gateway, global).await,
        Command::Serve => serve::handle(gateway).await,
        // Handled in main before a gateway exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}

/// Connect, logging instead of failing. Catalog listings and invocations
/// report the disconnected state themselves.
pub(crate) async fn try_connect(gateway: &Gateway) {
    if let Err(e) = gateway.connect().await {
        tracing::warn!(error = %e, "controller connection failed; continuing disconnected");
    }
}
