//! Clap derive structures for the `unigate` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use unigate_core::Category;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// unigate -- capability-aware tool broker for UniFi controllers
#[derive(Debug, Parser)]
#[command(
    name = "unigate",
    version,
    about = "Broker tool calls to a UniFi network controller",
    long_about = "Exposes a capability-filtered catalog of UniFi operations.\n\n\
        Detects controller version and hardware before invoking anything,\n\
        and serves the catalog over line-delimited JSON on stdio.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "UNIGATE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller URL (overrides profile)
    #[arg(long, short = 'c', env = "UNIGATE_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Site name
    #[arg(long, short = 's', env = "UNIGATE_SITE", global = true)]
    pub site: Option<String>,

    /// Controller API key
    #[arg(long, env = "UNIGATE_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "UNIGATE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "UNIGATE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "UNIGATE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect and invoke registered operations
    #[command(alias = "op")]
    Ops(OpsArgs),

    /// Show detected controller capabilities
    #[command(alias = "caps")]
    Capabilities(CapabilitiesArgs),

    /// Check controller reachability and authentication
    Health,

    /// Serve line-delimited JSON requests on stdin/stdout
    Serve,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Ops ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct OpsArgs {
    #[command(subcommand)]
    pub command: OpsCommand,
}

#[derive(Debug, Subcommand)]
pub enum OpsCommand {
    /// List every enabled operation
    #[command(alias = "ls")]
    List {
        /// Only operations in this category
        #[arg(long, value_parser = parse_category)]
        category: Option<Category>,
    },

    /// List operations the connected controller supports
    Available,

    /// Print the external catalog (name, description, input schema)
    Catalog,

    /// Show registry usage statistics
    Stats,

    /// Invoke an operation
    Call {
        /// Operation name (e.g. unifi_list_devices)
        name: String,

        /// Arguments as a JSON object
        #[arg(long, short = 'a', conflicts_with = "args_file")]
        args: Option<String>,

        /// Read arguments from a JSON file
        #[arg(long, short = 'f')]
        args_file: Option<PathBuf>,
    },
}

fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse::<Category>()
        .map_err(|_| format!("unknown category '{raw}'"))
}

// ── Capabilities ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CapabilitiesArgs {
    /// Bypass the cache and probe the controller
    #[arg(long, short = 'r')]
    pub refresh: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the loaded configuration (secrets redacted)
    Show,

    /// Store an API key in the system keyring for a profile
    SetKey {
        /// API key to store
        #[arg(long, env = "UNIGATE_NEW_API_KEY", hide_env_values = true)]
        key: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
