//! Observability module - request correlation and PII-safe log fields.

mod request_id;

pub use request_id::{RequestId, RequestIdMiddleware};

/// Mask the local part of an address for logging: `ana@example.com` becomes
/// `a***@example.com`.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) if local.chars().count() > 1 => format!("{first}***@{domain}"),
            _ => format!("***@{domain}"),
        },
        None => "***".to_string(),
    }
}
