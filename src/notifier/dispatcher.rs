//! Fans an alert out to every recipient.
//!
//! Individual recipient failures don't block the others. Transient transport
//! errors get one retry after a jittered backoff; permanent ones are logged
//! and reported immediately.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use rand::Rng;

use super::transport::{Transport, TransportError};
use super::{DeliveryReport, Notifier, NotifyError};

enum Outcome {
    Delivered,
    Suppressed,
    Failed(TransportError),
}

/// Production [`Notifier`]: retry and deduplication on top of a [`Transport`]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    /// Messages delivered inside the dedup window, keyed by recipient and content
    recent: Option<Cache<(String, String, String), ()>>,
    retry_backoff: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            recent: None,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Suppress byte-identical resends (same recipient, subject and body)
    /// inside `window`. A zero window disables it.
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.recent = if window.is_zero() {
            None
        } else {
            Some(Cache::builder().max_capacity(10_000).time_to_live(window).build())
        };
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    async fn deliver(&self, recipient: &str, subject: &str, body: &str) -> Outcome {
        let key = (recipient.to_string(), subject.to_string(), body.to_string());
        if let Some(recent) = &self.recent {
            if recent.contains_key(&key) {
                tracing::debug!(recipient, subject, "Duplicate alert suppressed");
                return Outcome::Suppressed;
            }
        }

        let result = match self.transport.send(recipient, subject, body).await {
            Err(e) if e.is_transient() => {
                let delay = self.backoff_with_jitter();
                tracing::warn!(
                    recipient,
                    transport = self.transport.name(),
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Transient delivery failure, retrying once"
                );
                tokio::time::sleep(delay).await;
                self.transport.send(recipient, subject, body).await
            }
            other => other,
        };

        match result {
            Ok(()) => {
                if let Some(recent) = &self.recent {
                    recent.insert(key, ());
                }
                tracing::info!(
                    recipient,
                    transport = self.transport.name(),
                    subject,
                    "Notification delivered"
                );
                Outcome::Delivered
            }
            Err(e) => {
                tracing::error!(
                    recipient,
                    transport = self.transport.name(),
                    error = %e,
                    "Notification delivery failed"
                );
                Outcome::Failed(e)
            }
        }
    }

    fn backoff_with_jitter(&self) -> Duration {
        let base = self.retry_backoff.as_millis() as u64;
        let jitter = if base == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=base)
        };
        Duration::from_millis(base + jitter)
    }
}

#[async_trait::async_trait]
impl Notifier for Dispatcher {
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<DeliveryReport, NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let outcomes = futures::future::join_all(
            recipients
                .iter()
                .map(|recipient| self.deliver(recipient, subject, body)),
        )
        .await;

        let mut report = DeliveryReport::default();
        for (recipient, outcome) in recipients.iter().zip(outcomes) {
            match outcome {
                Outcome::Delivered => report.delivered.push(recipient.clone()),
                Outcome::Suppressed => report.suppressed.push(recipient.clone()),
                Outcome::Failed(e) => report.failed.push((recipient.clone(), e.to_string())),
            }
        }

        if report.failed.is_empty() || report.reached_anyone() {
            Ok(report)
        } else {
            Err(NotifyError::AllFailed(report.failed))
        }
    }
}
