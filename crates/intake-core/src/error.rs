//! Domain-level error types.

use thiserror::Error;

use crate::ports::StoreError;

/// Policy registry errors.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid policy for user '{user_id}': {reason}")]
    InvalidPolicy { user_id: String, reason: String },

    #[error("No quota policy for user '{0}'")]
    NotFound(String),

    #[error("Stored policy for user '{user_id}' is unreadable: {reason}")]
    Corrupt { user_id: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Submission parsing errors.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Malformed submission: {0}")]
    Malformed(String),
}
