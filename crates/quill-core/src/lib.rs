//! # Quill Core
//!
//! The domain layer of the Quill blog.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, ports, form validation, pagination and the ranking helpers used by
//! the storage adapters.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;
pub mod recommend;
pub mod search;
pub mod sharing;
pub mod slug;

pub use error::DomainError;
