//! CLI parse: clap types for foldersync. No behavior; definitions only.

use clap::Parser;
use std::path::PathBuf;

/// Keep a replica directory identical to a source directory
#[derive(Parser, Debug)]
#[command(name = "foldersync")]
#[command(about = "Periodically mirror a source directory into a replica directory")]
pub struct Cli {
    /// Source directory (never modified)
    pub source: PathBuf,

    /// Replica directory (created if missing)
    pub replica: PathBuf,

    /// Seconds to wait between synchronization cycles
    pub interval: u64,

    /// Log file path (appended to)
    pub log_file: PathBuf,

    /// Configuration file path (merged over the global config file)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Run a single synchronization cycle and exit
    #[arg(long, default_value = "false")]
    pub once: bool,
}
