//! foldersync Binary
//!
//! Mirrors SOURCE into REPLICA every INTERVAL seconds, logging each change
//! to LOG_FILE and the console.

use anyhow::Context;
use clap::Parser;
use foldersync::cli::{Cli, RunContext};
use foldersync::logging::init_logging;
use std::process;
use tracing::error;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let context = RunContext::new(cli).context("Failed to load configuration")?;

    init_logging(Some(&context.config().logging)).context("Failed to initialize logging")?;

    context.execute().context("Synchronization failed")?;
    Ok(())
}
