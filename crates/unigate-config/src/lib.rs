//! Configuration for the unigate binary.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to a validated `unigate_core::GatewayConfig`. The CLI
//! layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use unigate_api::{RateLimitConfig, RetryConfig};
use unigate_core::{CoreError, GatewayConfig, TlsVerification};

/// Keyring service name under which API keys are stored.
pub const KEYRING_SERVICE: &str = "unigate";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("invalid gateway configuration: {0}")]
    Gateway(#[from] CoreError),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named controller profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub controller: String,

    /// Site name.
    #[serde(default = "default_site")]
    pub site: String,

    /// API key (plaintext; prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Total attempts per request, including the first.
    pub retry_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_max_delay_ms: Option<u64>,

    /// Client-side request budget per minute.
    pub requests_per_minute: Option<u32>,

    /// Capability snapshot validity in seconds.
    pub capability_ttl_secs: Option<u64>,

    /// Background health-check period in seconds.
    pub health_check_interval_secs: Option<u64>,
}

fn default_site() -> String {
    "default".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "unigate", "unigate").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unigate");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, overlaid with `UNIGATE_`-prefixed env vars
/// (`__` separates nesting levels, e.g. `UNIGATE_DEFAULTS__TIMEOUT`).
/// A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNIGATE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick `name`, else the configured default profile, else `"default"`.
pub fn resolve_profile<'a>(
    cfg: &'a Config,
    name: Option<&str>,
) -> Result<(String, &'a Profile), ConfigError> {
    let name = name
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    match cfg.profiles.get(&name) {
        Some(profile) => Ok((name, profile)),
        None => Err(ConfigError::ProfileNotFound {
            available: if cfg.profiles.is_empty() {
                "none".into()
            } else {
                cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
            },
            name,
        }),
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key: `api_key_env` → system keyring → plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_api_key(profile_name: &str, api_key: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .and_then(|entry| entry.set_password(api_key))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

/// TLS strategy: explicit `insecure = true` wins, then a custom CA, then
/// `insecure = false` for the system store. Unset means accept invalid,
/// since local controllers are typically self-signed.
pub fn resolve_tls(profile: &Profile) -> TlsVerification {
    match (profile.insecure, &profile.ca_cert) {
        (Some(true), _) => TlsVerification::DangerAcceptInvalid,
        (_, Some(ca_path)) => TlsVerification::CustomCa(ca_path.clone()),
        (Some(false), None) => TlsVerification::SystemDefaults,
        (None, None) => TlsVerification::DangerAcceptInvalid,
    }
}

/// Build a validated `GatewayConfig` from a profile, no CLI overrides.
pub fn profile_to_gateway_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<GatewayConfig, ConfigError> {
    let api_key = resolve_api_key(profile, profile_name)?;
    gateway_config(profile, api_key)
}

/// Build a validated `GatewayConfig` from a profile and an already
/// resolved key.
pub fn gateway_config(profile: &Profile, api_key: SecretString) -> Result<GatewayConfig, ConfigError> {
    let url: url::Url = profile
        .controller
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL: {}", profile.controller),
        })?;

    let mut config = GatewayConfig::new(url, api_key);
    config.site.clone_from(&profile.site);
    config.tls = resolve_tls(profile);
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(30));

    let defaults = RetryConfig::default();
    config.retry = RetryConfig {
        max_attempts: profile.retry_attempts.unwrap_or(defaults.max_attempts),
        base_delay: profile
            .retry_base_delay_ms
            .map_or(defaults.base_delay, Duration::from_millis),
        max_delay: profile
            .retry_max_delay_ms
            .map_or(defaults.max_delay, Duration::from_millis),
        jitter: defaults.jitter,
    };
    if let Some(rpm) = profile.requests_per_minute {
        config.rate_limit = RateLimitConfig {
            requests_per_minute: rpm,
            ..RateLimitConfig::default()
        };
    }
    if let Some(ttl) = profile.capability_ttl_secs {
        config.capability_ttl = Duration::from_secs(ttl);
    }
    config.health_check_interval = profile.health_check_interval_secs.map(Duration::from_secs);

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
output = "json"

[profiles.home]
controller = "https://192.168.1.1"
api_key = "plain-key"
api_key_env = "UNIGATE_TEST_KEY_THAT_IS_NEVER_SET"
timeout = 10
retry_attempts = 5
requests_per_minute = 120
capability_ttl_secs = 300

[profiles.lab]
controller = "https://lab.local:8443"
site = "lab"
api_key = "lab-key"
insecure = false
"#;

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_profiles_from_file() {
        let file = sample_file();
        let cfg = load_config_from(file.path()).unwrap();

        assert_eq!(cfg.default_profile.as_deref(), Some("home"));
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.timeout, 30);
        assert_eq!(cfg.profiles.len(), 2);
        assert_eq!(cfg.profiles["lab"].site, "lab");
        assert_eq!(cfg.profiles["home"].site, "default");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn profile_selection() {
        let file = sample_file();
        let cfg = load_config_from(file.path()).unwrap();

        let (name, _) = resolve_profile(&cfg, None).unwrap();
        assert_eq!(name, "home");
        let (name, profile) = resolve_profile(&cfg, Some("lab")).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(profile.controller, "https://lab.local:8443");

        let err = resolve_profile(&cfg, Some("office")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "profile 'office' not found (available: home, lab)"
        );
    }

    #[test]
    fn profile_becomes_gateway_config() {
        let file = sample_file();
        let cfg = load_config_from(file.path()).unwrap();

        let home = profile_to_gateway_config(&cfg.profiles["home"], "home").unwrap();
        assert_eq!(home.url.as_str(), "https://192.168.1.1/");
        assert_eq!(home.api_key.expose_secret(), "plain-key");
        assert_eq!(home.timeout, Duration::from_secs(10));
        assert_eq!(home.retry.max_attempts, 5);
        assert_eq!(home.rate_limit.requests_per_minute, 120);
        assert_eq!(home.capability_ttl, Duration::from_secs(300));
        assert_eq!(home.tls, TlsVerification::DangerAcceptInvalid);
        assert!(home.health_check_interval.is_none());

        let lab = profile_to_gateway_config(&cfg.profiles["lab"], "lab").unwrap();
        assert_eq!(lab.site, "lab");
        assert_eq!(lab.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn invalid_profiles_are_rejected() {
        let bad_url = Profile {
            controller: "not a url".into(),
            api_key: Some("k".into()),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_gateway_config(&bad_url, "x"),
            Err(ConfigError::Validation { .. })
        ));

        let zero_rpm = Profile {
            controller: "https://10.0.0.1".into(),
            site: "default".into(),
            api_key: Some("k".into()),
            requests_per_minute: Some(0),
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_gateway_config(&zero_rpm, "x"),
            Err(ConfigError::Gateway(_))
        ));
    }

    #[test]
    fn tls_resolution_order() {
        let mut profile = Profile {
            ca_cert: Some(PathBuf::from("/etc/unifi-ca.pem")),
            ..Profile::default()
        };
        assert_eq!(
            resolve_tls(&profile),
            TlsVerification::CustomCa(PathBuf::from("/etc/unifi-ca.pem"))
        );
        profile.insecure = Some(true);
        assert_eq!(resolve_tls(&profile), TlsVerification::DangerAcceptInvalid);
        assert_eq!(
            resolve_tls(&Profile::default()),
            TlsVerification::DangerAcceptInvalid
        );
    }

    #[test]
    fn save_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                controller: "https://192.168.1.1".into(),
                site: "default".into(),
                api_key_env: Some("HOME_KEY".into()),
                ..Profile::default()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        assert_eq!(loaded.profiles["home"].api_key_env.as_deref(), Some("HOME_KEY"));
    }
}
