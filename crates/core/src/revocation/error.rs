//! Revocation workflow error types.

use thiserror::Error;
use uchwala_shared::AppError;
use uchwala_shared::types::{DecisionId, RevocationRequestId, UserId};

use super::types::{RevocationAction, RevocationStatus};
use crate::decision::DecisionStatus;
use crate::signature::SignatureError;
use crate::storage::StorageError;

/// Errors that can occur while driving a revocation request.
#[derive(Debug, Error)]
pub enum RevocationError {
    /// The action is not allowed from the current status.
    #[error("cannot {action} a revocation request in status {from}")]
    InvalidTransition {
        /// Current status.
        from: RevocationStatus,
        /// Attempted action.
        action: RevocationAction,
    },

    /// The user already approved this request.
    #[error("user {0} has already approved this request")]
    DuplicateApproval(UserId),

    /// Final approval attempted without a valid document signature.
    #[error("document signature is missing or invalid")]
    UnverifiedSignature,

    /// Revocation request does not exist in the caller's business profile.
    #[error("revocation request not found: {0}")]
    NotFound(RevocationRequestId),

    /// Target decision does not exist in the caller's business profile.
    #[error("decision not found: {0}")]
    DecisionNotFound(DecisionId),

    /// Target decision is already revoked or has an open request.
    #[error("decision in status {0} cannot be revoked")]
    DecisionNotRevocable(DecisionStatus),

    /// The user is not one of the required approvers.
    #[error("user {0} is not a required approver")]
    NotRequiredApprover(UserId),

    /// Only the requester may cancel.
    #[error("only the requester may cancel this request")]
    NotRequester,

    /// Reason is blank.
    #[error("revocation reason is required")]
    ReasonRequired,

    /// The approver list is empty.
    #[error("at least one required approver is needed")]
    NoRequiredApprovers,

    /// The request changed since it was loaded.
    #[error("revocation request {0} was modified concurrently")]
    ConcurrentModification(RevocationRequestId),

    /// Document storage failed or rejected the upload.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Signature verifier failed.
    #[error(transparent)]
    Verifier(#[from] SignatureError),

    /// Repository operation failed.
    #[error("repository error: {0}")]
    Repository(String),
}

impl RevocationError {
    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(from: RevocationStatus, action: RevocationAction) -> Self {
        Self::InvalidTransition { from, action }
    }

    /// Create a repository error.
    #[must_use]
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ReasonRequired | Self::NoRequiredApprovers => 400,
            Self::NotRequiredApprover(_) | Self::NotRequester => 403,
            Self::NotFound(_) | Self::DecisionNotFound(_) => 404,
            Self::DuplicateApproval(_) | Self::ConcurrentModification(_) => 409,
            Self::InvalidTransition { .. }
            | Self::UnverifiedSignature
            | Self::DecisionNotRevocable(_) => 422,
            Self::Storage(StorageError::FileTooLarge { .. }) => 413,
            Self::Storage(err) if err.is_rejected_upload() => 400,
            Self::Storage(_) | Self::Repository(_) => 500,
            Self::Verifier(_) => 502,
        }
    }

    /// Get the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DuplicateApproval(_) => "DUPLICATE_APPROVAL",
            Self::UnverifiedSignature => "UNVERIFIED_SIGNATURE",
            Self::NotFound(_) => "REVOCATION_NOT_FOUND",
            Self::DecisionNotFound(_) => "DECISION_NOT_FOUND",
            Self::DecisionNotRevocable(_) => "DECISION_NOT_REVOCABLE",
            Self::NotRequiredApprover(_) => "NOT_REQUIRED_APPROVER",
            Self::NotRequester => "NOT_REQUESTER",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::NoRequiredApprovers => "NO_REQUIRED_APPROVERS",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Storage(err) if err.is_rejected_upload() => "INVALID_DOCUMENT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Verifier(_) => "VERIFIER_ERROR",
            Self::Repository(_) => "DATABASE_ERROR",
        }
    }
}

impl From<RevocationError> for AppError {
    fn from(err: RevocationError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::Validation(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            413 => Self::PayloadTooLarge(message),
            422 => Self::BusinessRule(message),
            502 => Self::ExternalService(message),
            _ => match err {
                RevocationError::Repository(_) => Self::Database(message),
                _ => Self::Internal(message),
            },
        }
    }
}
