//! scfdeploy CLI - inspect what a deploy pass would do and manage its state.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scfdeploy")]
#[command(about = "Plan serverless function deployments and inspect their state")]
#[command(version)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true, env = "SCFDEPLOY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the upload decision and trigger changes for a desired spec
    Plan {
        /// Desired function spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Packaged code archive to fingerprint
        #[arg(short, long)]
        artifact: PathBuf,

        /// State file (defaults to <stateRoot>/<name>/state.json)
        #[arg(long)]
        state: Option<PathBuf>,
    },

    /// Inspect or reset persisted deployment state
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Subcommand)]
enum StateCommand {
    /// Print the last committed state
    Show(commands::state::StateArgs),
    /// Reset the state to empty
    Clear(commands::state::StateArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,scfdeploy=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan {
            spec,
            artifact,
            state,
        } => commands::plan::run(&engine, &spec, &artifact, state.as_deref()),
        Commands::State { command } => match command {
            StateCommand::Show(args) => commands::state::show(&engine, &args),
            StateCommand::Clear(args) => commands::state::clear(&engine, &args),
        },
    }
}
