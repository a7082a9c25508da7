//! Domain-level error types.

use thiserror::Error;

use crate::forms::FieldErrors;

/// Failures raised while applying blog rules.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity_type} {id} does not exist")]
    NotFound { entity_type: &'static str, id: i64 },

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),
}

/// Storage failures, shared by every repository backend.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database unavailable: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Row not found")]
    NotFound,

    #[error("Integrity error: {0}")]
    Constraint(String),
}
