//! Dealsense CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use dealsense::cli::{Cli, Commands};
use dealsense::infrastructure::config::ConfigLoader;
use dealsense::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli.command, cli.config.as_deref(), json).await {
        dealsense::cli::handle_error(err, json);
    }
}

async fn run(command: Commands, config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load().context("Failed to load configuration")?,
    };
    let _logger = LoggerImpl::init(&config.logging).context("Failed to initialize logging")?;

    match command {
        Commands::Aggregate(args) => {
            dealsense::cli::commands::aggregate::execute(args, &config, json).await
        }
        Commands::Batch(args) => dealsense::cli::commands::batch::execute(args, &config, json).await,
    }
}
