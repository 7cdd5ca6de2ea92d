//! Merge rules: defaults, override order.
//!
//! Sources are layered lowest to highest: defaults, global file, explicit
//! file, `FOLDERSYNC_*` environment, then command-line overrides.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Default seconds between synchronization cycles.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("interval_secs", DEFAULT_INTERVAL_SECS)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "both")
}
