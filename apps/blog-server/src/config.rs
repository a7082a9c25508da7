//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use quill_infra::database::DatabaseConfig;
use quill_infra::{SmtpConfig, SmtpSecurity};

/// Where outgoing mail goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    /// Log every message.
    Console,
    /// Keep messages in an in-process outbox.
    Memory,
    /// Deliver through the relay in `SMTP_HOST`.
    Smtp,
}

impl MailBackend {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "memory" | "locmem" => MailBackend::Memory,
            "smtp" => MailBackend::Smtp,
            _ => MailBackend::Console,
        }
    }
}

/// Host names the server builds absolute links for.
///
/// A pattern is `*` (any host), `.example.com` (the domain and every
/// subdomain) or an exact name. Matching ignores case and the port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedHosts(Vec<String>);

impl AllowedHosts {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    fn parse(value: &str) -> Self {
        Self::new(value.split(','))
    }

    /// Whether a `Host` header value names one of the allowed hosts.
    pub fn allows(&self, host: &str) -> bool {
        let name = match host_name(host) {
            Some(name) => name.to_ascii_lowercase(),
            None => return false,
        };

        self.0.iter().any(|pattern| {
            if pattern == "*" {
                return true;
            }
            match pattern.strip_prefix('.') {
                Some(domain) => name == domain || name.ends_with(pattern.as_str()),
                None => name == *pattern,
            }
        })
    }
}

impl Default for AllowedHosts {
    fn default() -> Self {
        Self::new(["localhost", "127.0.0.1", "[::1]"])
    }
}

/// Host name without its port and trailing dot, or `None` when malformed.
fn host_name(host: &str) -> Option<&str> {
    let name = if host.starts_with('[') {
        let end = host.find(']')?;
        match &host[end + 1..] {
            "" => &host[..=end],
            rest => {
                let port = rest.strip_prefix(':')?;
                if !port.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                &host[..=end]
            }
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if port.bytes().all(|b| b.is_ascii_digit()) => name,
            Some(_) => return None,
            None => host,
        }
    };

    let name = name.strip_suffix('.').unwrap_or(name);
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'[' | b']' | b':'));
    valid.then_some(name)
}

/// Staff account created at startup when missing.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub mail_backend: MailBackend,
    pub mail_from: String,
    /// Relay settings, present when `SMTP_HOST` is set.
    pub smtp: Option<SmtpConfig>,
    /// Absolute base used in shared links, feeds and the sitemap. Falls back
    /// to the request's scheme and host, checked against `allowed_hosts`.
    pub site_url: Option<String>,
    pub allowed_hosts: AllowedHosts,
    /// Trust `X-Forwarded-For` when keying the rate limiter. Only safe behind
    /// a proxy that overwrites the header.
    pub trust_proxy: bool,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connect_timeout: Duration::from_secs(8),
        });

        let smtp = env::var("SMTP_HOST")
            .ok()
            .filter(|host| !host.is_empty())
            .map(|host| {
                let security = env::var("SMTP_SECURITY")
                    .map(|v| SmtpSecurity::parse(&v))
                    .unwrap_or_default();
                SmtpConfig {
                    host,
                    port: env::var("SMTP_PORT")
                        .ok()
                        .and_then(|p| p.parse().ok())
                        .unwrap_or_else(|| security.default_port()),
                    username: env::var("SMTP_USERNAME").ok().filter(|u| !u.is_empty()),
                    password: env::var("SMTP_PASSWORD").ok(),
                    security,
                    timeout: Duration::from_secs(
                        env::var("SMTP_TIMEOUT_SECS")
                            .ok()
                            .and_then(|t| t.parse().ok())
                            .unwrap_or(10),
                    ),
                }
            });

        let admin = match (env::var("ADMIN_USERNAME"), env::var("ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap {
                    email: env::var("ADMIN_EMAIL")
                        .unwrap_or_else(|_| format!("{username}@localhost")),
                    username,
                    password,
                })
            }
            _ => None,
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database,
            mail_backend: env::var("MAIL_BACKEND")
                .map(|v| MailBackend::parse(&v))
                .unwrap_or(MailBackend::Console),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "webmaster@localhost".to_string()),
            smtp,
            site_url: env::var("SITE_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            allowed_hosts: env::var("ALLOWED_HOSTS")
                .map(|v| AllowedHosts::parse(&v))
                .unwrap_or_default(),
            trust_proxy: env::var("TRUST_PROXY")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_backend_parsing() {
        assert_eq!(MailBackend::parse("memory"), MailBackend::Memory);
        assert_eq!(MailBackend::parse(" LOCMEM "), MailBackend::Memory);
        assert_eq!(MailBackend::parse("SMTP"), MailBackend::Smtp);
        assert_eq!(MailBackend::parse("console"), MailBackend::Console);
        assert_eq!(MailBackend::parse("anything"), MailBackend::Console);
    }

    #[test]
    fn test_default_hosts_are_local_only() {
        let hosts = AllowedHosts::default();

        assert!(hosts.allows("localhost"));
        assert!(hosts.allows("localhost:8080"));
        assert!(hosts.allows("127.0.0.1:8000"));
        assert!(hosts.allows("[::1]:8080"));
        assert!(!hosts.allows("evil.attacker.test"));
        assert!(!hosts.allows("localhost.attacker.test"));
    }

    #[test]
    fn test_host_patterns() {
        let hosts = AllowedHosts::parse(" .example.com, blog.test ");

        assert!(hosts.allows("example.com"));
        assert!(hosts.allows("www.Example.com:443"));
        assert!(hosts.allows("blog.test."));
        assert!(!hosts.allows("badexample.com"));
        assert!(!hosts.allows("blog.test:abc"));
        assert!(!hosts.allows("blog.test@evil.test"));
        assert!(!hosts.allows(""));

        assert!(AllowedHosts::parse("*").allows("anything.test"));
        assert!(!AllowedHosts::parse("").allows("localhost"));
    }
}
