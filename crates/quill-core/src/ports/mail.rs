//! Outgoing mail port.

use async_trait::async_trait;

/// A plain-text message ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail transport - abstraction over delivery backends.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message. Failures are not retried.
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Mail delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Message rejected: {0}")]
    Rejected(String),
}
