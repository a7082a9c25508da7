//! SMTP delivery through `lettre`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use quill_core::ports::{MailError, Mailer, OutgoingMail};

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with `STARTTLS`.
    #[default]
    StartTls,
    /// TLS from the first byte (SMTPS).
    Tls,
    /// No encryption. Only for local relays.
    None,
}

impl SmtpSecurity {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "tls" | "ssl" | "smtps" => SmtpSecurity::Tls,
            "none" | "plain" => SmtpSecurity::None,
            _ => SmtpSecurity::StartTls,
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            SmtpSecurity::StartTls => 587,
            SmtpSecurity::Tls => 465,
            SmtpSecurity::None => 25,
        }
    }
}

/// SMTP relay settings.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
    pub timeout: Duration,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("security", &self.security)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Mailer that hands every message to an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| MailError::Transport(e.to_string()))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Transport(e.to_string()))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mut builder = builder.port(config.port).timeout(Some(config.timeout));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            security = ?config.security,
            "SMTP mailer configured"
        );
        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e| MailError::Rejected(format!("invalid address '{address}': {e}")))
}

/// Plain-text message with every recipient on the `To` line.
fn build_message(mail: OutgoingMail) -> Result<Message, MailError> {
    if mail.to.is_empty() {
        return Err(MailError::Rejected("no recipients".to_string()));
    }

    let mut builder = Message::builder()
        .from(mailbox(&mail.from)?)
        .subject(mail.subject);
    for to in &mail.to {
        builder = builder.to(mailbox(to)?);
    }

    builder
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body)
        .map_err(|e| MailError::Rejected(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = build_message(mail)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        tracing::debug!(code = %response.code(), "SMTP relay accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: &[&str]) -> OutgoingMail {
        OutgoingMail {
            from: "blog@example.com".into(),
            to: to.iter().map(|t| t.to_string()).collect(),
            subject: "Ana recommends you read Hello".into(),
            body: "Read Hello at http://localhost/".into(),
        }
    }

    fn local_relay(port: u16) -> SmtpConfig {
        SmtpConfig {
            host: "127.0.0.1".into(),
            port,
            username: None,
            password: None,
            security: SmtpSecurity::None,
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_security_parsing_and_ports() {
        assert_eq!(SmtpSecurity::parse("SSL"), SmtpSecurity::Tls);
        assert_eq!(SmtpSecurity::parse("none"), SmtpSecurity::None);
        assert_eq!(SmtpSecurity::parse(""), SmtpSecurity::StartTls);
        assert_eq!(SmtpSecurity::StartTls.default_port(), 587);
        assert_eq!(SmtpSecurity::Tls.default_port(), 465);
    }

    #[test]
    fn test_message_carries_headers_and_body() {
        let message = build_message(mail(&["bob@example.com", "eve@example.com"])).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: blog@example.com"));
        assert!(raw.contains("bob@example.com"));
        assert!(raw.contains("eve@example.com"));
        assert!(raw.contains("Subject: Ana recommends you read Hello"));
        assert!(raw.contains("Read Hello at http://localhost/"));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let result = build_message(mail(&["not-an-address"]));

        assert!(matches!(result, Err(MailError::Rejected(_))));
    }

    #[test]
    fn test_password_is_not_debug_printed() {
        let mut config = local_relay(25);
        config.password = Some("hunter2".into());

        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_transport_error() {
        // Nothing listens on port 1.
        let mailer = SmtpMailer::new(&local_relay(1)).unwrap();

        let result = mailer.send(mail(&["bob@example.com"])).await;

        assert!(matches!(result, Err(MailError::Transport(_))));
    }
}
