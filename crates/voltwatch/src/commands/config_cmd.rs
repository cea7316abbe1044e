//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Password, Select};

use voltwatch_core::Tariff;
use voltwatch_core::config::{DEFAULT_DEVICE_ID, DEFAULT_USERNAME};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Mask plaintext passwords before anything is printed.
fn redact(cfg: &mut Config) {
    for profile in cfg.profiles.values_mut() {
        if profile.password.is_some() {
            profile.password = Some(REDACTED.into());
        }
    }
}

/// Format config for display. Expects an already-redacted config.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if let Some(ref device) = p.device_id {
            let _ = writeln!(out, "device_id = \"{device}\"");
        }
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if let Some(ref pw) = p.password {
            let _ = writeln!(out, "password = \"{pw}\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(secs) = p.poll_interval_secs {
            let _ = writeln!(out, "poll_interval_secs = {secs}");
        }
        if let Some(rate) = p.peak_rate {
            let _ = writeln!(out, "peak_rate = {rate}");
        }
        if let Some(rate) = p.off_peak_rate {
            let _ = writeln!(out, "off_peak_rate = {rate}");
        }
        if let Some(ref hours) = p.peak_hours {
            let _ = writeln!(out, "peak_hours = \"{hours}\"");
        }
        if let Some(ref currency) = p.currency {
            let _ = writeln!(out, "currency = \"{currency}\"");
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Offer to store the password in the system keyring or return it for
/// plaintext config.
///
/// Returns `Some(password)` if the user chose plaintext, `None` if stored
/// in the keyring.
fn prompt_password_storage(password: &str, profile_name: &str) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        voltwatch_config::store_password(profile_name, password)?;
        eprintln!("   ✓ Password stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(password.to_owned()))
    }
}

/// Ask for tariff overrides, defaulting to the stock tariff.
fn prompt_tariff(profile: &mut Profile) -> Result<(), CliError> {
    let defaults = Tariff::default();

    let peak_rate: f64 = Input::new()
        .with_prompt("Peak rate per kWh")
        .default(defaults.peak_rate)
        .interact_text()
        .map_err(prompt_err)?;
    let off_peak_rate: f64 = Input::new()
        .with_prompt("Off-peak rate per kWh")
        .default(defaults.off_peak_rate)
        .interact_text()
        .map_err(prompt_err)?;
    let peak_hours: String = Input::new()
        .with_prompt("Peak hours (HH:MM-HH:MM)")
        .default(defaults.peak_window.to_string())
        .validate_with(|input: &String| {
            input
                .parse::<voltwatch_core::PeakWindow>()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;
    let currency: String = Input::new()
        .with_prompt("Currency")
        .default(defaults.currency)
        .interact_text()
        .map_err(prompt_err)?;

    profile.peak_rate = Some(peak_rate);
    profile.off_peak_rate = Some(off_peak_rate);
    profile.peak_hours = Some(peak_hours);
    profile.currency = Some(currency);
    Ok(())
}

fn init(global: &GlobalOpts) -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("⚡ voltwatch configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = config::load_config_or_default();

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(global.profile.clone().unwrap_or_else(|| "default".into()))
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Server and device
    let url: String = Input::new()
        .with_prompt("Server URL")
        .default("http://192.168.1.7:5000".into())
        .validate_with(|input: &String| {
            url::Url::parse(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;
    let device_id: String = Input::new()
        .with_prompt("Device id")
        .default(DEFAULT_DEVICE_ID.into())
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Credentials
    let username: String = Input::new()
        .with_prompt("Username")
        .default(DEFAULT_USERNAME.into())
        .interact_text()
        .map_err(prompt_err)?;
    let password = Password::new()
        .with_prompt("Password (leave empty to use VOLTWATCH_PASSWORD)")
        .allow_empty_password(true)
        .interact()
        .map_err(prompt_err)?;
    let password = if password.is_empty() {
        None
    } else {
        prompt_password_storage(&password, &profile_name)?
    };

    let mut profile = Profile {
        url,
        device_id: Some(device_id),
        username: Some(username),
        password,
        ..Profile::default()
    };

    // 4. Tariff
    let customize = Confirm::new()
        .with_prompt("Customize the tariff?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    if customize {
        prompt_tariff(&mut profile)?;
    }

    // 5. Write config
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: voltwatch login");
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(global),

        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            redact(&mut cfg);
            let out = output::render_single(global.output, &cfg, format_config, |c| {
                c.default_profile.clone().unwrap_or_default()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: voltwatch config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    name,
                    available: config::available_profiles(&cfg),
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: config::available_profiles(&cfg),
                });
            }

            let password = Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(prompt_err)?;
            voltwatch_config::store_password(&profile_name, &password)?;

            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_password() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                url: "http://192.168.1.7:5000".into(),
                username: Some("admin".into()),
                password: Some("hunter2".into()),
                peak_hours: Some("18:00-22:00".into()),
                ..Profile::default()
            },
        );
        cfg
    }

    #[test]
    fn show_never_prints_plaintext_passwords() {
        let mut cfg = config_with_password();
        redact(&mut cfg);
        let text = format_config(&cfg);
        assert!(!text.contains("hunter2"), "{text}");
        assert!(text.contains("password = \"****\""), "{text}");
        assert!(text.contains("[profiles.home]"), "{text}");
        assert!(text.contains("peak_hours = \"18:00-22:00\""), "{text}");

        let json = output::render_json_compact(&cfg);
        assert!(!json.contains("hunter2"), "{json}");
    }

    #[test]
    fn profiles_without_password_stay_unset() {
        let mut cfg = Config::default();
        cfg.profiles.insert("bare".into(), Profile::default());
        redact(&mut cfg);
        assert!(cfg.profiles.get("bare").is_some_and(|p| p.password.is_none()));
    }
}
