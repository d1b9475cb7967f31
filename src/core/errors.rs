//! Domain error types
//!
//! Business-logic failures, distinct from infrastructure errors. Dispatch
//! failures never appear here: the engines convert those into
//! error-classified assistant messages instead of raising them.

use thiserror::Error;

/// Errors related to session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// Message text was empty after trimming (and nothing was attached)
    #[error("Message is empty")]
    EmptyMessage,

    /// Session not found
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Operation requires a comparison session
    #[error("Session is not a comparison session: {0}")]
    NotComparison(String),

    /// Comparison send with neither side selected
    #[error("No model selected for either comparison side")]
    NoModelSelected,

    /// Imported/exported payload was not a valid session
    #[error("Invalid session payload: {0}")]
    InvalidPayload(String),

    /// Storage error surfaced under `PersistPolicy::Surface`
    #[error("Storage error: {0}")]
    Storage(String),
}
