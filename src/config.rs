//! Configuration System
//!
//! Layered configuration for a mirroring run: built-in defaults, the global
//! config file, an optional explicit file, `FOLDERSYNC_*` environment
//! variables and command-line overrides, merged with the `config` crate.

use crate::error::SyncError;
use crate::logging::LoggingConfig;
use crate::tree::path::ensure_disjoint;
use config::Environment;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

mod merge {
    pub mod merge_policy;
}

mod sources {
    pub mod explicit_file;
    pub mod global_file;
}

pub use merge::merge_policy::DEFAULT_INTERVAL_SECS;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directory treated as the source of truth
    #[serde(default)]
    pub source: PathBuf,

    /// Directory made to mirror the source
    #[serde(default)]
    pub replica: PathBuf,

    /// Seconds between the start of one wait and the next cycle
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            replica: PathBuf::new(),
            interval_secs: default_interval_secs(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate the entire configuration
    ///
    /// Roots must be given, distinct and not nested inside each other, and
    /// the interval must be at least one second.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.source.as_os_str().is_empty() {
            return Err(SyncError::Config("Source path cannot be empty".to_string()));
        }
        if self.replica.as_os_str().is_empty() {
            return Err(SyncError::Config("Replica path cannot be empty".to_string()));
        }
        if self.interval_secs == 0 {
            return Err(SyncError::Config(
                "Interval must be at least 1 second".to_string(),
            ));
        }
        ensure_disjoint(&self.source, &self.replica)
    }
}

/// Builds a [`SyncConfig`] from every configured source
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    use_global: bool,
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            use_global: true,
            file: None,
            env: None,
        }
    }

    /// Skip the global config file
    pub fn without_global(mut self) -> Self {
        self.use_global = false;
        self
    }

    /// Read an explicit config file; it must exist
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Read variables from `vars` instead of the process environment
    pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Merge all sources and deserialize. Does not validate.
    ///
    /// Command-line values are applied by the caller on the returned struct.
    pub fn load(&self) -> Result<SyncConfig, SyncError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;

        if self.use_global {
            builder = sources::global_file::add_to_builder(builder)?;
        }
        if let Some(file) = &self.file {
            builder = sources::explicit_file::add_to_builder(builder, file)?;
        }

        builder = builder.add_source(
            Environment::with_prefix("FOLDERSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(self.env.clone()),
        );

        let config: SyncConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
