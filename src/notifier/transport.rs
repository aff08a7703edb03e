//! Message transports: SMTP via `lettre`, and a log-only dry run

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Sender;

/// Delivers one message to one recipient
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError>;

    /// Human-readable transport name (e.g. "smtp")
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Worth one more attempt (connection reset, 4xx reply, timeout)
    #[error("transient: {0}")]
    Transient(String),

    /// Retrying cannot help (bad address, authentication refused, 5xx reply)
    #[error("permanent: {0}")]
    Permanent(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

/// SMTP transport built from the configured [`Sender`]
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpTransport {
    /// Port is taken from `sender.addr` (default 587). Port 465 uses implicit
    /// TLS; any other port upgrades with STARTTLS when the server offers it.
    pub fn from_sender(sender: &Sender) -> Result<Self, TransportError> {
        let from: Mailbox = sender
            .user
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                TransportError::Permanent(format!("invalid sender '{}': {}", sender.user, e))
            })?;

        let port = smtp_port(&sender.addr);
        let host = sender.host.trim();

        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| TransportError::Permanent(e.to_string()))?
        } else {
            let tls = TlsParameters::new(host.to_string())
                .map_err(|e| TransportError::Permanent(e.to_string()))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .tls(Tls::Opportunistic(tls))
        };

        let transport = builder
            .port(port)
            .credentials(Credentials::new(
                sender.user.clone(),
                sender.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

/// Port part of a `host:port` address
fn smtp_port(addr: &str) -> u16 {
    addr.trim()
        .rsplit_once(':')
        .and_then(|(_, port)| port.parse().ok())
        .unwrap_or(587)
}

#[async_trait::async_trait]
impl Transport for SmtpTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        let recipient: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            TransportError::Permanent(format!("invalid recipient '{}': {}", to, e))
        })?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(recipient)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| TransportError::Permanent(e.to_string()))?;

        self.transport.send(email).await.map_err(|e| {
            if e.is_permanent() || e.is_client() {
                TransportError::Permanent(e.to_string())
            } else {
                TransportError::Transient(e.to_string())
            }
        })?;

        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Writes alerts to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait::async_trait]
impl Transport for LogTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        tracing::warn!(recipient = %to, subject = %subject, "Alert (dry run): {}", body);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender(addr: &str) -> Sender {
        Sender {
            user: "alerts@example.com".to_string(),
            password: "password".to_string(),
            host: "smtp.example.com".to_string(),
            addr: addr.to_string(),
        }
    }

    #[test]
    fn test_smtp_port() {
        assert_eq!(smtp_port("smtp.example.com:25"), 25);
        assert_eq!(smtp_port("smtp.example.com:465"), 465);
        assert_eq!(smtp_port("smtp.example.com"), 587);
        assert_eq!(smtp_port("smtp.example.com:abc"), 587);
    }

    #[tokio::test]
    async fn test_from_sender_valid() {
        let transport = SmtpTransport::from_sender(&sender("smtp.example.com:25")).unwrap();
        assert_eq!(transport.name(), "smtp");
        assert!(SmtpTransport::from_sender(&sender("smtp.example.com:465")).is_ok());
    }

    #[test]
    fn test_from_sender_invalid_user() {
        let mut bad = sender("smtp.example.com:25");
        bad.user = "not-an-email".to_string();

        let err = SmtpTransport::from_sender(&bad).err().unwrap();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_permanent() {
        let transport = SmtpTransport::from_sender(&sender("smtp.example.com:25")).unwrap();
        let err = transport.send("nobody", "subject", "body").await.unwrap_err();
        assert!(matches!(err, TransportError::Permanent(_)));
    }

    #[tokio::test]
    async fn test_log_transport() {
        let transport = LogTransport;
        assert!(transport.send("ops@example.com", "s", "b").await.is_ok());
        assert_eq!(transport.name(), "log");
    }
}
