//! Mail transports - SMTP delivery, console logging and an in-memory outbox.

mod console;
mod memory;
mod smtp;

pub use console::ConsoleMailer;
pub use memory::InMemoryMailer;
pub use smtp::{SmtpConfig, SmtpMailer, SmtpSecurity};
