//! Alert delivery
//!
//! The escalation engine decides *that* and *what* to send and hands the
//! message to a [`Notifier`]. The [`Dispatcher`] is the production notifier:
//! it fans out to every recipient over a [`Transport`], retries transient
//! failures once, and suppresses identical sends inside a dedup window.

pub mod dispatcher;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use transport::{LogTransport, SmtpTransport, Transport, TransportError};

/// Something that can deliver an alert to a list of recipients
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `subject`/`body` to every recipient.
    ///
    /// Partial failure is reported in the returned [`DeliveryReport`]; an
    /// error is returned only when nothing could be delivered.
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<DeliveryReport, NotifyError>;
}

/// Per-recipient outcome of one notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<String>,
    /// Skipped because an identical message was sent recently
    pub suppressed: Vec<String>,
    /// Recipient and error message
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    /// Whether the message actually went out to at least one recipient.
    /// Suppressed duplicates don't count.
    pub fn reached_anyone(&self) -> bool {
        !self.delivered.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        self.reached_anyone() && !self.failed.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No recipients configured")]
    NoRecipients,

    #[error("Delivery failed for every recipient: {0:?}")]
    AllFailed(Vec<(String, String)>),
}
