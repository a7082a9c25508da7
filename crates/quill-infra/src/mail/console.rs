//! Mail transport that writes messages to the log instead of delivering them.

use async_trait::async_trait;

use quill_core::ports::{MailError, Mailer, OutgoingMail};

/// Development mailer: every message is emitted as a structured `info` event.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if mail.to.is_empty() {
            return Err(MailError::Rejected("no recipients".to_string()));
        }

        tracing::info!(
            from = %mail.from,
            to = %mail.to.join(", "),
            subject = %mail.subject,
            "\n{}",
            mail.body
        );
        Ok(())
    }
}
