//! CLI command definitions for the `tether` binary.
//!
//! Uses clap derive macros for argument parsing. Every command loads the
//! stored session first, so `status`, `refresh` and `chat` act on whatever
//! `login` left behind.

pub mod chat;
pub mod session;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Keep a signed-in session alive and chat with the agent.
#[derive(Parser)]
#[command(name = "tether", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a credential issued by the identity service.
    Login {
        /// Bearer token to install.
        #[arg(long, env = "TETHER_TOKEN", hide_env_values = true)]
        token: String,

        /// Identifier of the signed-in user.
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        email: String,

        /// Display name shown in status output.
        #[arg(long)]
        name: Option<String>,

        /// Mark the profile as an administrator.
        #[arg(long)]
        admin: bool,
    },

    /// Sign out and revoke the stored credential.
    Logout,

    /// Show who is signed in and when the credential expires.
    Status,

    /// Renew the credential now.
    Refresh,

    /// Send one chat turn and stream the reply.
    Chat {
        /// Message to send.
        message: String,

        /// Continue an existing conversation instead of starting a new one.
        #[arg(short, long)]
        conversation: Option<String>,
    },

    /// Keep the session alive in the foreground and print session events.
    Watch,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
