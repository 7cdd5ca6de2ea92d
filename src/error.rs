//! Error types for the foldersync mirroring engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by hashing, reconciliation and configuration.
///
/// Only root-level failures ever escape [`crate::reconcile::TreeReconciler::run`];
/// per-item failures are reported as events and the walk continues.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source directory unavailable: {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source {source_root:?} and replica {replica_root:?} overlap")]
    OverlappingRoots {
        source_root: PathBuf,
        replica_root: PathBuf,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        SyncError::Config(err.to_string())
    }
}
