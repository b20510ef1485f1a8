//! Merges the config file, the selected profile, and CLI overrides into a
//! validated `GatewayConfig`.

use secrecy::SecretString;
use unigate_config::{Config, Profile};
use unigate_core::GatewayConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Profile name: `--profile`, else the file's default, else `"default"`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the gateway config for the current invocation.
///
/// With a matching profile, flags override its fields. Without one, the
/// flags alone must supply a controller URL and API key.
pub fn build_gateway_config(global: &GlobalOpts, cfg: &Config) -> Result<GatewayConfig, CliError> {
    let name = active_profile_name(global, cfg);

    let base = match unigate_config::resolve_profile(cfg, global.profile.as_deref()) {
        Ok((_, profile)) => profile.clone(),
        // An explicit --profile must exist.
        Err(e) if global.profile.is_some() => return Err(e.into()),
        Err(_) => {
            let controller = global.controller.clone().ok_or_else(|| CliError::NoConfig {
                path: unigate_config::config_path().display().to_string(),
            })?;
            Profile {
                controller,
                site: "default".into(),
                ..Profile::default()
            }
        }
    };

    let profile = apply_overrides(base, global);
    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => unigate_config::resolve_api_key(&profile, &name)?,
    };

    Ok(unigate_config::gateway_config(&profile, api_key)?)
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref controller) = global.controller {
        profile.controller.clone_from(controller);
    }
    if let Some(ref site) = global.site {
        profile.site.clone_from(site);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}
