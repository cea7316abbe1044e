mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voltwatch_core::{FileTokenStore, Session};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "voltwatch", &mut std::io::stdout());
            Ok(())
        }

        // Logout only touches local state
        Command::Logout(args) => commands::auth::logout(&args, &cli.global),

        // All other commands talk to the server
        cmd => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(&cli.global, &cfg);
            let session_config = config::resolve_session_config(&cfg, &profile_name, &cli.global)?;

            let store = FileTokenStore::new(config::token_path(&profile_name));
            let session = Session::new(session_config, Arc::new(store))?;

            tracing::debug!(command = ?cmd, profile = %profile_name, "dispatching command");
            let result = commands::dispatch(cmd, &session, &profile_name, &cli.global).await;
            session.shutdown();
            result
        }
    }
}
