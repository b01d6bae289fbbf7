//! apx: rFactor 2 mod synchronizer for APX-managed servers.
//!
//! # Usage
//!
//! ```text
//! apx [--root <dir>] [--workshop <dir>] [--verbose] <command>
//!
//! apx connect <target> [--dry-run]
//! apx status [--json]
//! apx remove-updates
//! apx config show|set-root <dir>|set-workshop <dir>
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{
    config::ConfigCommand, connect::ConnectArgs, remove_updates::RemoveUpdatesArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "apx",
    version,
    about = "Bring a local rFactor 2 installation in line with a mod server",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// rFactor 2 installation root (overrides the config file).
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Steam workshop content directory (overrides the config file).
    #[arg(long, global = true, value_name = "DIR")]
    pub workshop: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize with a mod server and print the launch URI.
    Connect(ConnectArgs),

    /// Show the applied mod and the installed state of its components.
    Status(StatusArgs),

    /// Delete every update-tier directory the applied mod declares.
    RemoveUpdates(RemoveUpdatesArgs),

    /// Inspect or change the persisted configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match cli.command {
        Commands::Connect(args) => args.run(&cli.global),
        Commands::Status(args) => args.run(&cli.global),
        Commands::RemoveUpdates(args) => args.run(&cli.global),
        Commands::Config { command } => commands::config::run(command, &cli.global),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
