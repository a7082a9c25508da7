//! # Quill Shared
//!
//! Wire types shared between the blog server and its clients: the JSON
//! contexts handed to the presentation layer and the admin API payloads.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse, FieldErrorMap};
