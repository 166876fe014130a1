//! Cross-cutting error types for Sift.
//!
//! Domain-specific errors (`DatabaseError`, `ScreeningError`, ...) live in
//! their respective crates. `StoreError` is here because the store contract is
//! shared between the screening engine and every store implementation.

use thiserror::Error;

/// Errors that can be raised by any Sift crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures of the persistent store. Always fatal for a screening run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or a write/read failed.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Persisted data could not be decoded into domain types.
    #[error("Corrupt store data: {0}")]
    Corrupt(String),
}
