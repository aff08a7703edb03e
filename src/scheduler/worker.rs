use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::escalation::{EscalationEngine, FileMonitor, PollError};

/// Polling loop for a single watched file
pub struct FileWorker {
    monitor: FileMonitor,
    engine: Arc<EscalationEngine>,
}

impl FileWorker {
    pub fn new(monitor: FileMonitor, engine: Arc<EscalationEngine>) -> Self {
        Self { monitor, engine }
    }

    /// Start the loop. It only checks `shutdown` between polls, so a poll in
    /// progress always completes its state update before the task exits.
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let path = self.monitor.key().to_string();
            let every = self.monitor.file.interval();
            tracing::info!(path = %path, service = %self.monitor.service, "File worker started with interval {:?}", every);

            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }

                if let Err(e) = self.engine.poll(&self.monitor).await {
                    match &e {
                        PollError::Tail(_) => {
                            tracing::error!(path = %path, error = %e, "Log file unreadable, retrying next tick");
                        }
                        PollError::Store(_) => {
                            tracing::error!(path = %path, error = %e, "State backend failure, poll discarded");
                        }
                    }
                }
            }

            tracing::info!(path = %path, "File worker stopped");
        })
    }
}
