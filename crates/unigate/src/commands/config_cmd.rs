//! Config subcommand handlers.

use tabled::Tabled;
use unigate_config::{Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "PROFILE")]
    name: String,
    #[tabled(rename = "CONTROLLER")]
    controller: String,
    #[tabled(rename = "SITE")]
    site: String,
    #[tabled(rename = "API KEY")]
    key_source: String,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(
                &unigate_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = redacted(unigate_config::load_config()?);
            let active = active_profile_name(global, &cfg);
            let out = output::render_single(
                global.output,
                &cfg,
                |c| profile_table(c, &active),
                |c| c.profiles.keys().cloned().collect::<Vec<_>>().join("\n"),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetKey { key } => {
            if key.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }
            let cfg = unigate_config::load_config_or_default();
            let profile = active_profile_name(global, &cfg);
            unigate_config::store_api_key(&profile, &key)?;
            if !global.quiet {
                eprintln!("Stored API key for profile '{profile}' in the system keyring");
            }
            Ok(())
        }
    }
}

fn redacted(mut cfg: Config) -> Config {
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(REDACTED.into());
        }
    }
    cfg
}

fn key_source(profile: &Profile) -> String {
    match (&profile.api_key_env, &profile.api_key) {
        (Some(var), _) => format!("env:{var}"),
        (None, Some(_)) => "plaintext".into(),
        (None, None) => "keyring".into(),
    }
}

fn profile_table(cfg: &Config, active: &str) -> String {
    if cfg.profiles.is_empty() {
        return format!(
            "No profiles configured in {}",
            unigate_config::config_path().display()
        );
    }
    let rows: Vec<ProfileRow> = cfg
        .profiles
        .iter()
        .map(|(name, profile)| ProfileRow {
            marker: if name == active { "*" } else { "" },
            name: name.clone(),
            controller: profile.controller.clone(),
            site: profile.site.clone(),
            key_source: key_source(profile),
        })
        .collect();
    tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string()
}
