//! One independent polling loop per watched file
//!
//! Loops share nothing but the state backend. A single `watch` channel
//! carries the stop signal to all of them.

pub mod worker;

pub use worker::FileWorker;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::escalation::{EscalationEngine, FileMonitor};

/// Owns the per-file polling tasks
pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Scheduler {
    /// Spawn a worker for every monitor
    pub fn start(engine: Arc<EscalationEngine>, monitors: Vec<FileMonitor>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = monitors
            .into_iter()
            .map(|monitor| {
                let path = monitor.key().to_string();
                let handle =
                    FileWorker::new(monitor, Arc::clone(&engine)).start(shutdown_rx.clone());
                (path, handle)
            })
            .collect::<Vec<_>>();

        tracing::info!(files = handles.len(), "Scheduler started");
        Self {
            shutdown_tx,
            handles,
        }
    }

    /// Number of running workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every worker and wait until all have finished their current poll
    pub async fn stop(self) {
        // Receivers are kept by the workers, so this only fails once all exited
        let _ = self.shutdown_tx.send(true);

        let (paths, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();
        let results = futures::future::join_all(handles).await;

        for (path, result) in paths.iter().zip(results) {
            if let Err(e) = result {
                tracing::error!(path = %path, error = %e, "File worker panicked");
            }
        }

        tracing::info!("Scheduler stopped");
    }
}
