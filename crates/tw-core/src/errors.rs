//! Cross-cutting error types for Trendwatch.
//!
//! Domain-specific errors (e.g., `DatabaseError`, `UpstreamError`) are defined
//! in their respective crates. They converge in `tw-watch` and, finally, as
//! `anyhow` at the binary edge.

use thiserror::Error;

/// Errors that can be raised by any Trendwatch crate.
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

    /// Data failed validation at the model boundary.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
