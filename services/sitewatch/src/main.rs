//! Sitewatch CLI
//!
//! Command-line interface for the website and API uptime monitor.

use std::path::PathBuf;

use clap::Parser;
use sitewatch::logging::init_logging;
use sitewatch::{load_config, Config, RunMode};

#[derive(Parser)]
#[command(name = "sitewatch")]
#[command(about = "Website and API uptime monitor with email alerts")]
#[command(version)]
struct Args {
    /// Run a single check cycle and exit (default)
    #[arg(long, conflicts_with = "continuous")]
    once: bool,

    /// Check continuously at the configured interval
    #[arg(long)]
    continuous: bool,

    /// Path to a JSON configuration file (otherwise read from the environment)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::from_env()?,
    };

    let _guard = init_logging(&config.log_level, &config.log_dir)?;

    tracing::debug!(
        "Parsed command line arguments: once={}, continuous={}, config={:?}",
        args.once,
        args.continuous,
        args.config
    );

    let mode = if args.continuous {
        RunMode::Continuous
    } else {
        RunMode::Once
    };

    sitewatch::run(config, mode).await?;

    Ok(())
}
