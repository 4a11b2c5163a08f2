//! Tether CLI entry point.
//!
//! Binary name: `tether`
//!
//! Parses CLI arguments, sets up tracing, wires the session services and
//! dispatches to the command handler.

mod cli;
mod state;
mod view;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let verbosity = tether_observe::Verbosity::from_flags(cli.verbose, cli.quiet);
    tether_observe::init_tracing(verbosity, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tether", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(!cli.quiet && !cli.json).await?;

    let result = match cli.command {
        Commands::Login {
            token,
            user_id,
            email,
            name,
            admin,
        } => cli::session::login(&state, token, user_id, email, name, admin, cli.json).await,
        Commands::Logout => cli::session::logout(&state, cli.json).await,
        Commands::Status => cli::session::status(&state, cli.json).await,
        Commands::Refresh => cli::session::refresh(&state, cli.json).await,
        Commands::Watch => cli::session::watch(&state, cli.json).await,
        Commands::Chat {
            message,
            conversation,
        } => cli::chat::chat(&state, message, conversation, cli.json, cli.verbose).await,
        Commands::Completions { .. } => Ok(()),
    };

    tether_observe::shutdown_tracing();
    result
}
