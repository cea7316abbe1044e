//! Command handlers, one module per top-level subcommand.

pub mod auth;
pub mod config_cmd;
pub mod cost;
pub mod history;
pub mod live;
pub mod util;

use voltwatch_core::Session;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a server-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Live(args) => live::handle(session, &args, global).await,
        Command::History(args) => history::handle(session, &args, global).await,
        Command::Cost(args) => cost::handle(session, &args, global).await,
        Command::Login => auth::login(session, profile_name, global).await,
        Command::Logout(_) | Command::Config(_) | Command::Completions(_) => {
            Err(CliError::Validation {
                field: "command".into(),
                reason: "handled without a server session".into(),
            })
        }
    }
}
