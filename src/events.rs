//! Event schema and sinks for mirroring actions.
//!
//! The reconciler never logs directly: every change it makes to the replica is
//! described as a [`SyncEvent`] and handed to an injected [`EventSink`].

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// One action taken (or attempted) against the replica
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    DirectoryCreated {
        path: PathBuf,
    },
    FileCopied {
        source: PathBuf,
        destination: PathBuf,
    },
    DirectoryDeleted {
        path: PathBuf,
    },
    FileDeleted {
        path: PathBuf,
    },
    /// A single item could not be synchronized and was skipped
    ItemFailed {
        action: ItemAction,
        path: PathBuf,
        error: String,
    },
}

/// Operation that failed for an [`SyncEvent::ItemFailed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemAction {
    Walk,
    CreateDirectory,
    CopyFile,
    DeleteDirectory,
    DeleteFile,
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            ItemAction::Walk => "read",
            ItemAction::CreateDirectory => "create directory",
            ItemAction::CopyFile => "copy file",
            ItemAction::DeleteDirectory => "delete directory",
            ItemAction::DeleteFile => "delete file",
        };
        f.write_str(verb)
    }
}

impl SyncEvent {
    /// True for events that describe a successful change to the replica
    pub fn is_mutation(&self) -> bool {
        !matches!(self, SyncEvent::ItemFailed { .. })
    }

    pub fn is_error(&self) -> bool {
        !self.is_mutation()
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::DirectoryCreated { path } => {
                write!(f, "Created directory: {}", path.display())
            }
            SyncEvent::FileCopied {
                source,
                destination,
            } => write!(
                f,
                "Copied/Updated file: {} to {}",
                source.display(),
                destination.display()
            ),
            SyncEvent::DirectoryDeleted { path } => {
                write!(f, "Deleted directory: {}", path.display())
            }
            SyncEvent::FileDeleted { path } => write!(f, "Deleted file: {}", path.display()),
            SyncEvent::ItemFailed {
                action,
                path,
                error,
            } => write!(f, "Failed to {} {}: {}", action, path.display(), error),
        }
    }
}

/// Destination for [`SyncEvent`]s
pub trait EventSink: Send + Sync {
    fn record(&self, event: SyncEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn record(&self, event: SyncEvent) {
        (**self).record(event)
    }
}

/// Forwards events to the `tracing` subscriber
///
/// Mutations are logged at info level, failures at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: SyncEvent) {
        if event.is_error() {
            error!("{}", event);
        } else {
            info!("{}", event);
        }
    }
}

/// A recorded event with the time it was received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub ts: DateTime<Utc>,
    pub event: SyncEvent,
}

/// Keeps every event in memory, for tests and embedding callers
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events, oldest first
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().iter().map(|r| r.event.clone()).collect()
    }

    pub fn records(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Events that changed the replica
    pub fn mutations(&self) -> Vec<SyncEvent> {
        self.events().into_iter().filter(SyncEvent::is_mutation).collect()
    }

    /// Events for items that were skipped after a failure
    pub fn failures(&self) -> Vec<SyncEvent> {
        self.events().into_iter().filter(SyncEvent::is_error).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: SyncEvent) {
        self.events.lock().push(RecordedEvent {
            ts: Utc::now(),
            event,
        });
    }
}

/// Sends every event to each inner sink in order
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn record(&self, event: SyncEvent) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}
