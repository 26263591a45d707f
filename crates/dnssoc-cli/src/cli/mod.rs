//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::{anyhow, Context as _, Result};
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_deref())?;

    // CLI flag wins over the config file
    let level = cli.logging.as_deref().unwrap_or(&config.logging);
    init_logging(level)?;

    // Create context for commands
    let ctx = commands::Context { config };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Correlate(args) => commands::correlate::execute(ctx, args).await,
        Commands::FetchIocs(args) => commands::fetch_iocs::execute(ctx, args).await,
    }
}

/// Install the tracing subscriber, logging to stderr so stdout stays
/// reserved for command output.
fn init_logging(level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid logging level {level:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install logging: {e}"))?;

    Ok(())
}
