//! catch: find and verify interferometric calibrator stars.

mod cli;
mod search;
mod verify;

use anyhow::Context;
use celestial_calibrators::config::Settings;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {:?}", path),
        None => "Invalid default configuration".to_string(),
    })?;
    if cli.mirror {
        settings.service.prefer_alternate();
    }

    match &cli.command {
        Commands::Search(args) => search::run(args, &cli, &settings),
        Commands::Verify(args) => verify::run(args, &cli, &settings),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
