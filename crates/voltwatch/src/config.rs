//! CLI configuration: thin wrapper around `voltwatch_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --device, --insecure, --timeout).

use voltwatch_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use voltwatch_config::{
    Config, Profile, config_path, load_config_or_default, save_config, token_path,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Build a `SessionConfig` for `profile_name`, with flag overrides.
///
/// Without a matching profile, `--url` alone is enough: everything else
/// falls back to defaults and the password comes from the environment or
/// keyring.
pub fn resolve_session_config(
    config: &Config,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<SessionConfig, CliError> {
    let mut profile = match config.profiles.get(profile_name) {
        Some(p) => p.clone(),
        None => {
            let Some(url) = global.url.as_deref() else {
                if config.profiles.is_empty() {
                    return Err(CliError::NoConfig {
                        path: config_path().display().to_string(),
                    });
                }
                return Err(CliError::ProfileNotFound {
                    name: profile_name.into(),
                    available: available_profiles(config),
                });
            };
            Profile {
                url: url.to_owned(),
                ..Profile::default()
            }
        }
    };

    apply_overrides(&mut profile, global);
    Ok(voltwatch_config::profile_to_session_config(&profile, profile_name)?)
}

/// Flag values win over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if let Some(ref device) = global.device {
        profile.device_id = Some(device.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
}
