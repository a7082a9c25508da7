//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`.
//! This crate contains the storage backends, mail transports, authentication
//! and rate limiting.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL storage via SeaORM
//!
//! Without `postgres` only the in-memory store is available.

pub mod auth;
pub mod database;
pub mod mail;
pub mod memory;
pub mod rate_limit;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use database::{DatabaseConfig, DatabaseConnections};
pub use mail::{ConsoleMailer, InMemoryMailer, SmtpConfig, SmtpMailer, SmtpSecurity};
pub use memory::InMemoryStore;
pub use rate_limit::{InMemoryRateLimiter, RateLimitConfig};
