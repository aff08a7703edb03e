//! Per-poll state machine: read, count, compare, persist, notify

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use super::message::AlertMessage;
use super::tier::{compute_tier, NotifyPolicy, Transition};
use crate::config::{ConfigError, Settings, WatchedFile};
use crate::notifier::{Notifier, NotifyError};
use crate::storage::{MonitorState, StateStore, StoreError};
use crate::tailer::{LineMatcher, TailError, Tailer};

/// A watched file together with its compiled matcher and owning service
#[derive(Debug, Clone)]
pub struct FileMonitor {
    pub service: String,
    pub file: WatchedFile,
    matcher: LineMatcher,
}

impl FileMonitor {
    pub fn new(service: impl Into<String>, file: WatchedFile) -> Result<Self, ConfigError> {
        let matcher = LineMatcher::new(&file.pattern).map_err(|e| ConfigError::InvalidFile {
            path: file.path.clone(),
            reason: format!("invalid pattern: {}", e),
        })?;

        Ok(Self {
            service: service.into(),
            file,
            matcher,
        })
    }

    /// State store key
    pub fn key(&self) -> &str {
        &self.file.path
    }
}

/// Result of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// First sight of the file: its end was recorded, nothing evaluated
    Baseline { offset: u64 },
    Evaluated {
        match_count: u64,
        previous_tier: usize,
        tier: usize,
        transition: Transition,
        notified: bool,
    },
}

impl PollOutcome {
    pub fn tier(&self) -> usize {
        match self {
            PollOutcome::Baseline { .. } => 0,
            PollOutcome::Evaluated { tier, .. } => *tier,
        }
    }

    pub fn notified(&self) -> bool {
        matches!(self, PollOutcome::Evaluated { notified: true, .. })
    }
}

/// A poll that did not complete. Stored state is left as it was.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Tail(#[from] TailError),

    #[error("State backend failure: {0}")]
    Store(#[from] StoreError),
}

/// Combines new match counts with stored state and decides on alerts
pub struct EscalationEngine {
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    tailer: Tailer,
    policy: NotifyPolicy,
    replay_existing: bool,
}

impl EscalationEngine {
    pub fn new(
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
        settings: &Settings,
    ) -> Self {
        Self {
            store,
            notifier,
            tailer: Tailer::new(settings.max_read_bytes),
            policy: NotifyPolicy {
                notify_on_deescalation: settings.notify_on_deescalation,
            },
            replay_existing: settings.replay_existing,
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Run one poll for a file
    pub async fn poll(&self, monitor: &FileMonitor) -> Result<PollOutcome, PollError> {
        let key = monitor.key();
        let path = Path::new(key);

        let prior = match self.store.get(key)? {
            Some(state) => state,
            None if !self.replay_existing => {
                let offset = self.tailer.file_len(path).await?;
                self.store.set(key, &MonitorState::baseline(offset))?;
                tracing::info!(path = %key, offset, "Baseline recorded");
                return Ok(PollOutcome::Baseline { offset });
            }
            None => MonitorState::default(),
        };

        let chunk = self.tailer.read(path, prior.offset).await?;
        let match_count = monitor.matcher.count(&chunk.content);

        self.apply(monitor, prior, chunk.new_offset, match_count)
            .await
    }

    /// Advance the state machine with one interval's match count
    async fn apply(
        &self,
        monitor: &FileMonitor,
        prior: MonitorState,
        new_offset: u64,
        match_count: u64,
    ) -> Result<PollOutcome, PollError> {
        let file = &monitor.file;
        let key = monitor.key();

        let tier = compute_tier(match_count, file.boundary, &file.limits, file.increase);
        let transition = Transition::between(prior.level, tier);

        let mut next = MonitorState {
            offset: new_offset,
            last_count: match_count,
            level: tier,
            last_notified_at: prior.last_notified_at,
        };

        // No notification unless the new tier is safely recorded
        self.store.set(key, &next)?;

        tracing::debug!(
            path = %key,
            match_count,
            tier,
            previous_tier = prior.level,
            "Poll complete"
        );

        let mut notified = false;
        if self.policy.should_notify(transition) {
            let message = AlertMessage::compose(
                &monitor.service,
                file,
                match_count,
                prior.level,
                tier,
                transition,
            );

            match self
                .notifier
                .notify(&file.emails, &message.subject, &message.body)
                .await
            {
                Ok(report) if !report.reached_anyone() => {
                    tracing::debug!(
                        path = %key,
                        suppressed = report.suppressed.len(),
                        "Alert identical to a recent one, nothing sent"
                    );
                }
                Ok(report) => {
                    if report.is_partial() {
                        tracing::warn!(
                            path = %key,
                            failed = report.failed.len(),
                            delivered = report.delivered.len(),
                            "Alert partially delivered"
                        );
                    }
                    notified = true;
                    next.last_notified_at = Some(Utc::now());
                    if let Err(e) = self.store.set(key, &next) {
                        tracing::error!(path = %key, error = %e, "Failed to record notification time");
                    }
                }
                Err(NotifyError::NoRecipients) => {
                    tracing::warn!(path = %key, tier, "Tier changed but no recipients are configured");
                }
                Err(e) => {
                    tracing::error!(path = %key, tier, error = %e, "Alert delivery failed");
                }
            }
        }

        Ok(PollOutcome::Evaluated {
            match_count,
            previous_tier: prior.level,
            tier,
            transition,
            notified,
        })
    }
}
