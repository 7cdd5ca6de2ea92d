//! foldersync: One-Way Directory Mirroring
//!
//! Keeps a replica directory identical to a source directory. Each cycle
//! creates missing directories, copies new or changed files (detected by MD5
//! fingerprint) and prunes anything the source no longer has. Every change is
//! reported as a [`events::SyncEvent`] to an injected sink.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod reconcile;
pub mod scheduler;
pub mod tree;
pub mod types;

pub use error::SyncError;
pub use events::{EventSink, MemorySink, SyncEvent, TracingSink};
pub use reconcile::TreeReconciler;
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use types::Fingerprint;
