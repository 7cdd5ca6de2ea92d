//! CLI route: turns parsed arguments into a configuration and runs it.

use crate::cli::parse::Cli;
use crate::config::{ConfigLoader, SyncConfig};
use crate::error::SyncError;
use crate::events::{EventSink, TracingSink};
use crate::scheduler::SyncScheduler;
use std::sync::Arc;
use tracing::info;

/// Everything needed to run the command that was parsed
pub struct RunContext {
    config: SyncConfig,
    once: bool,
}

impl RunContext {
    /// Load layered configuration and apply the command line on top
    pub fn new(cli: &Cli) -> Result<Self, SyncError> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &cli.config {
            loader = loader.with_file(path);
        }
        let config = apply_cli(loader.load()?, cli);
        Ok(Self {
            config,
            once: cli.once,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Validate the roots and run with events sent to the log
    pub fn execute(&self) -> Result<(), SyncError> {
        self.execute_with(Arc::new(TracingSink))
    }

    /// Validate the roots and run, sending events to `sink`
    ///
    /// With `--once` a fatal cycle is returned as an error. Otherwise the
    /// scheduler runs until the process is stopped.
    pub fn execute_with(&self, sink: Arc<dyn EventSink>) -> Result<(), SyncError> {
        self.config.validate()?;

        let scheduler = SyncScheduler::new(
            &self.config.source,
            &self.config.replica,
            self.config.interval(),
            sink,
        );

        info!(
            source = %self.config.source.display(),
            replica = %self.config.replica.display(),
            interval_secs = self.config.interval_secs,
            "foldersync starting"
        );

        if self.once {
            scheduler.run_once()
        } else {
            scheduler.start();
            Ok(())
        }
    }
}

/// Command-line values take precedence over every other source
fn apply_cli(mut config: SyncConfig, cli: &Cli) -> SyncConfig {
    config.source = cli.source.clone();
    config.replica = cli.replica.clone();
    config.interval_secs = cli.interval;
    config.logging.file = Some(cli.log_file.clone());

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    if let Some(output) = &cli.log_output {
        config.logging.output = output.clone();
    }
    config
}
