//! Periodic Sync Scheduler
//!
//! Runs the reconciler once per interval until cancelled. Cancellation is
//! observed between cycles only: a cycle that has started always runs to
//! completion.

use crate::error::SyncError;
use crate::events::EventSink;
use crate::reconcile::TreeReconciler;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Cloneable handle used to stop a running [`SyncScheduler`]
#[derive(Clone)]
pub struct SchedulerHandle {
    running: Arc<RwLock<bool>>,
    wake: Arc<Mutex<Option<mpsc::Sender<()>>>>,
}

impl SchedulerHandle {
    /// Ask the scheduler to stop after the current cycle
    ///
    /// If the scheduler is waiting for the next tick it wakes immediately.
    pub fn cancel(&self) {
        *self.running.write() = false;
        if let Some(tx) = self.wake.lock().take() {
            let _ = tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        !*self.running.read()
    }
}

/// Repeating driver around [`TreeReconciler::run`]
pub struct SyncScheduler {
    source: PathBuf,
    replica: PathBuf,
    interval: Duration,
    reconciler: TreeReconciler,
    running: Arc<RwLock<bool>>,
    wake_tx: Arc<Mutex<Option<mpsc::Sender<()>>>>,
    wake_rx: mpsc::Receiver<()>,
}

impl SyncScheduler {
    /// Create a scheduler mirroring `source` onto `replica` every `interval`
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval: Duration,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source: source.into(),
            replica: replica.into(),
            interval,
            reconciler: TreeReconciler::new(sink),
            running: Arc::new(RwLock::new(true)),
            wake_tx: Arc::new(Mutex::new(Some(tx))),
            wake_rx: rx,
        }
    }

    /// Handle for cancelling from another thread
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            running: Arc::clone(&self.running),
            wake: Arc::clone(&self.wake_tx),
        }
    }

    /// Perform exactly one synchronization cycle
    pub fn run_once(&self) -> Result<(), SyncError> {
        info!("Starting synchronization");
        let started = Instant::now();
        self.reconciler.run(&self.source, &self.replica)?;
        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            "Synchronization completed"
        );
        Ok(())
    }

    /// Run cycles until cancelled, returning the number of cycles started
    ///
    /// A fatal error in one cycle is logged and the next cycle is attempted
    /// after the usual interval.
    pub fn start(&self) -> usize {
        let mut cycles = 0;

        loop {
            if !*self.running.read() {
                break;
            }

            cycles += 1;
            if let Err(e) = self.run_once() {
                error!(error = %e, "Synchronization failed");
            }

            if !*self.running.read() {
                break;
            }

            match self.wake_rx.recv_timeout(self.interval) {
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
