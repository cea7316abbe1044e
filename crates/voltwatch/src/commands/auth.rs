//! `login` / `logout` handlers.

use voltwatch_core::{FileTokenStore, Session, TokenStore};

use crate::cli::{GlobalOpts, LogoutArgs};
use crate::commands::util;
use crate::config;
use crate::error::CliError;

/// Force a fresh token exchange and persist the result.
pub async fn login(session: &Session, profile_name: &str, global: &GlobalOpts) -> Result<(), CliError> {
    let credential = session.credentials().acquire(session.cancel_token()).await?;
    let path = config::token_path(profile_name);
    tracing::debug!(path = %path.display(), "token persisted");

    if !global.quiet {
        eprintln!(
            "✓ Logged in to {} as {} (profile '{profile_name}')",
            session.config().url,
            session.config().username
        );
        eprintln!(
            "  Token acquired {} and stored at {}",
            credential.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"),
            path.display()
        );
    }
    Ok(())
}

/// Drop the stored token; optionally also the keyring password.
pub fn logout(args: &LogoutArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = config::active_profile_name(global, &cfg);

    let store = FileTokenStore::new(config::token_path(&profile_name));
    store.clear()?;
    if !global.quiet {
        eprintln!("✓ Token removed for profile '{profile_name}'");
    }

    if args.forget_password {
        let prompt = format!("Remove the keyring password for profile '{profile_name}'?");
        if util::confirm(&prompt, global.yes)? {
            voltwatch_config::delete_password(&profile_name)?;
            if !global.quiet {
                eprintln!("✓ Keyring password removed");
            }
        }
    }
    Ok(())
}
