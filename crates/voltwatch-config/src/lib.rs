//! Configuration for the voltwatch CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! token file location, and translation to `voltwatch_core::SessionConfig`.

use std::collections::HashMap;
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

use voltwatch_core::config::DEFAULT_USERNAME;
use voltwatch_core::{PeakWindow, SessionConfig, Tariff, TlsVerification};

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "voltwatch";
/// Prefix for environment overrides (`VOLTWATCH_DEFAULTS__OUTPUT=json`).
pub const ENV_PREFIX: &str = "VOLTWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

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
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use, given an optional override.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::UnknownProfile {
            profile: name.into(),
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
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

/// A named server/device profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "http://192.168.1.7:5000").
    pub url: String,

    /// Device to poll; defaults to the stock firmware id.
    pub device_id: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name holding the password.
    pub password_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    pub insecure: Option<bool>,

    /// Per-attempt timeout (seconds).
    pub timeout: Option<u64>,
    pub retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,

    pub poll_interval_secs: Option<u64>,
    pub history_capacity: Option<usize>,

    // Tariff
    pub peak_rate: Option<f64>,
    pub off_peak_rate: Option<f64>,
    /// Peak window, e.g. "18:00-22:00".
    pub peak_hours: Option<String>,
    pub currency: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "voltwatch", "voltwatch")
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("voltwatch");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where a profile's bearer token is persisted.
pub fn token_path(profile_name: &str) -> PathBuf {
    let base = project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    );
    base.join("tokens").join(format!("{profile_name}.json"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still merging environment overrides.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Login name: profile, then `VOLTWATCH_USERNAME`, then the stock default.
pub fn resolve_username(profile: &Profile) -> String {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("VOLTWATCH_USERNAME").ok())
        .unwrap_or_else(|| DEFAULT_USERNAME.into())
}

/// Password: env var, then system keyring, then plaintext config.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Env var (profile-specific name first)
    let env_names = profile
        .password_env
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("VOLTWATCH_PASSWORD"));
    for name in env_names {
        if let Ok(pw) = std::env::var(name) {
            return Ok(SecretString::from(pw));
        }
    }

    // 2. Keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

/// Remove a profile's password from the keyring. Missing entries are fine.
pub fn delete_password(profile_name: &str) -> Result<(), ConfigError> {
    match keyring_entry(profile_name)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Translation to core ─────────────────────────────────────────────

/// Build the tariff from profile overrides on top of the defaults.
pub fn resolve_tariff(profile: &Profile) -> Result<Tariff, ConfigError> {
    let defaults = Tariff::default();
    let peak_window = match profile.peak_hours {
        Some(ref hours) => hours.parse::<PeakWindow>().map_err(|e| ConfigError::Validation {
            field: "peak_hours".into(),
            reason: e.to_string(),
        })?,
        None => defaults.peak_window,
    };

    for (field, rate) in [("peak_rate", profile.peak_rate), ("off_peak_rate", profile.off_peak_rate)] {
        if rate.is_some_and(|r| !r.is_finite() || r < 0.0) {
            return Err(ConfigError::Validation {
                field: field.into(),
                reason: "must be a non-negative number".into(),
            });
        }
    }

    Ok(Tariff {
        peak_rate: profile.peak_rate.unwrap_or(defaults.peak_rate),
        off_peak_rate: profile.off_peak_rate.unwrap_or(defaults.off_peak_rate),
        peak_window,
        currency: profile.currency.clone().unwrap_or(defaults.currency),
    })
}

/// Build a `SessionConfig` from a profile.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<SessionConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let password = resolve_password(profile, profile_name)?;
    session_config_with(profile, url, resolve_username(profile), password)
}

/// Map profile fields onto a `SessionConfig` with credentials already
/// resolved.
fn session_config_with(
    profile: &Profile,
    url: url::Url,
    username: String,
    password: SecretString,
) -> Result<SessionConfig, ConfigError> {
    let mut config = SessionConfig::new(url, username, password);

    if let Some(ref device) = profile.device_id {
        config.device_id.clone_from(device);
    }
    config.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    if let Some(secs) = profile.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(retries) = profile.retries {
        config.retries = retries;
    }
    if let Some(ms) = profile.retry_delay_ms {
        config.retry_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = profile.poll_interval_secs {
        if secs == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(capacity) = profile.history_capacity {
        config.history_capacity = capacity;
    }
    config.tariff = resolve_tariff(profile)?;

    Ok(config)
}
