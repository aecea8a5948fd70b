//! Decision error types.

use thiserror::Error;
use uchwala_shared::types::DecisionId;

/// Errors raised while creating or loading decisions.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// Decision does not exist in the caller's business profile.
    #[error("decision not found: {0}")]
    NotFound(DecisionId),

    /// Decision number is blank.
    #[error("decision number is required")]
    NumberRequired,

    /// Decision title is blank.
    #[error("decision title is required")]
    TitleRequired,

    /// Another decision in the same business profile already uses this number.
    #[error("decision number {0} already exists")]
    DuplicateNumber(String),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl DecisionError {
    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }
}

impl From<DecisionError> for uchwala_shared::AppError {
    fn from(err: DecisionError) -> Self {
        let message = err.to_string();
        match err {
            DecisionError::NotFound(_) => Self::NotFound(message),
            DecisionError::NumberRequired | DecisionError::TitleRequired => {
                Self::Validation(message)
            }
            DecisionError::DuplicateNumber(_) => Self::Conflict(message),
            DecisionError::Repository(_) => Self::Database(message),
        }
    }
}
