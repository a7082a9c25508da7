//! In-memory outbox - collects messages for inspection.

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::ports::{MailError, Mailer, OutgoingMail};

/// Mailer that keeps every sent message in memory.
///
/// Used by tests and by deployments without a mail relay.
#[derive(Default)]
pub struct InMemoryMailer {
    outbox: RwLock<Vec<OutgoingMail>>,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first.
    pub async fn outbox(&self) -> Vec<OutgoingMail> {
        self.outbox.read().await.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if mail.to.is_empty() {
            return Err(MailError::Rejected("no recipients".to_string()));
        }
        self.outbox.write().await.push(mail);
        Ok(())
    }
}
