//! Revocation workflow domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uchwala_shared::types::{BusinessProfileId, DecisionId, RevocationRequestId, UserId};

use crate::decision::DecisionStatus;
use crate::signature::SignatureVerification;

/// Revocation request status.
///
/// The valid transitions are:
/// - Pending → PendingVerification (upload document)
/// - PendingVerification → PendingVerification (replace document)
/// - PendingVerification → Verified (valid signature stored)
/// - PendingVerification → Pending (invalid signature stored)
/// - Verified → Approved (last required approval)
/// - PendingVerification | Verified → Rejected (reject)
/// - PendingVerification | Verified → Cancelled (cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationStatus {
    /// No document attached yet, or the last one failed verification.
    Pending,
    /// Document attached, signature not verified yet.
    PendingVerification,
    /// Signature verified, collecting approvals.
    Verified,
    /// Every required approver signed off (terminal).
    Approved,
    /// Rejected by an approver (terminal).
    Rejected,
    /// Withdrawn by the requester (terminal).
    Cancelled,
}

impl RevocationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingVerification => "pending_verification",
            Self::Verified => "verified",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "pending_verification" => Some(Self::PendingVerification),
            "verified" => Some(Self::Verified),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true once no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for RevocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that drive the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevocationAction {
    /// Attach or replace the revoking-resolution document.
    UploadDocument,
    /// Store the verifier's result.
    StoreVerification,
    /// Add one approval.
    Approve,
    /// Reject the request.
    Reject,
    /// Cancel the request.
    Cancel,
}

impl RevocationAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadDocument => "upload_document",
            Self::StoreVerification => "store_verification",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for RevocationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the uploaded revoking-resolution document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// URL handed out to clients.
    pub url: String,
    /// Original filename.
    pub name: String,
    /// Storage key, used to read the file back for verification.
    pub storage_key: String,
    /// Canonical MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Who uploaded it.
    pub uploaded_by: UserId,
    /// When it was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// One approver's sign-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Approver.
    pub user_id: UserId,
    /// When the approval was given.
    pub approved_at: DateTime<Utc>,
    /// Approver's signature (e.g. a typed name or signature token).
    pub signature: Option<String>,
}

/// A revocation workflow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequest {
    /// Unique identifier.
    pub id: RevocationRequestId,
    /// Decision being revoked.
    pub decision_id: DecisionId,
    /// Tenant scope.
    pub business_profile_id: BusinessProfileId,
    /// Justification; immutable.
    pub reason: String,
    /// Who opened the request.
    pub requested_by: UserId,
    /// When the request was opened.
    pub requested_at: DateTime<Utc>,
    /// Approvers fixed at creation, without duplicates.
    pub required_approvers: Vec<UserId>,
    /// Revoking-resolution document.
    pub document: Option<DocumentRef>,
    /// Result of the last verification pass.
    pub signature_verification: Option<SignatureVerification>,
    /// Approvals in the order they were given; at most one per user.
    pub approvals: Vec<Approval>,
    /// Current status.
    pub status: RevocationStatus,
    /// Set on terminal transitions.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Set on terminal transitions.
    pub resolved_by: Option<UserId>,
    /// Set on terminal transitions.
    pub resolution_notes: Option<String>,
    /// Optimistic concurrency counter.
    pub version: i32,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RevocationRequest {
    /// Returns true if `user_id` is one of the required approvers.
    #[must_use]
    pub fn is_required_approver(&self, user_id: UserId) -> bool {
        self.required_approvers.contains(&user_id)
    }

    /// Returns true if `user_id` already approved.
    #[must_use]
    pub fn has_approved(&self, user_id: UserId) -> bool {
        self.approvals.iter().any(|a| a.user_id == user_id)
    }

    /// Required approvers who have not approved yet, in creation order.
    #[must_use]
    pub fn pending_approvers(&self) -> Vec<UserId> {
        self.required_approvers
            .iter()
            .copied()
            .filter(|id| !self.has_approved(*id))
            .collect()
    }

    /// Every required approver is present among the approvals.
    #[must_use]
    pub fn quorum_reached(&self) -> bool {
        self.required_approvers
            .iter()
            .all(|id| self.has_approved(*id))
    }

    /// Returns true if the stored signature snapshot passed verification.
    #[must_use]
    pub fn signature_valid(&self) -> bool {
        self.signature_verification
            .as_ref()
            .is_some_and(SignatureVerification::is_valid)
    }

    /// Whether `user_id` may approve right now.
    #[must_use]
    pub fn can_approve(&self, user_id: UserId) -> bool {
        self.status == RevocationStatus::Verified
            && self.is_required_approver(user_id)
            && !self.has_approved(user_id)
    }

    /// Whether `user_id` may reject right now.
    #[must_use]
    pub fn can_reject(&self, user_id: UserId) -> bool {
        is_open_for_resolution(self.status) && self.is_required_approver(user_id)
    }

    /// Whether `user_id` may cancel right now.
    #[must_use]
    pub fn can_cancel(&self, user_id: UserId) -> bool {
        is_open_for_resolution(self.status) && self.requested_by == user_id
    }
}

/// States from which reject and cancel are allowed.
pub(crate) fn is_open_for_resolution(status: RevocationStatus) -> bool {
    matches!(
        status,
        RevocationStatus::PendingVerification | RevocationStatus::Verified
    )
}

/// Input for opening a revocation request.
#[derive(Debug, Clone)]
pub struct NewRevocationRequest {
    /// Pre-generated ID (documents are stored under it).
    pub id: RevocationRequestId,
    /// Decision being revoked.
    pub decision_id: DecisionId,
    /// Tenant scope.
    pub business_profile_id: BusinessProfileId,
    /// Justification.
    pub reason: String,
    /// Who opens the request.
    pub requested_by: UserId,
    /// Approvers; duplicates are collapsed.
    pub required_approvers: Vec<UserId>,
    /// Document supplied up front.
    pub document: Option<DocumentRef>,
}

/// Outcome of a workflow step: the new request state plus, when the step
/// changes it, the status the parent decision must take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Request after the step.
    pub request: RevocationRequest,
    /// New decision status, if any.
    pub decision_status: Option<DecisionStatus>,
}
