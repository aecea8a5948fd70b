//! Revocation workflow state machine.
//!
//! Pure transitions: every function takes the current request, validates the
//! action against its status and the acting user, and returns the next state
//! together with the decision status to project. Nothing here touches
//! storage, so a failed step leaves no partial state behind.

use chrono::{DateTime, Utc};
use uchwala_shared::types::UserId;

use super::error::RevocationError;
use super::projector::project;
use super::types::{
    Approval, DocumentRef, NewRevocationRequest, RevocationAction, RevocationRequest,
    RevocationStatus, Transition, is_open_for_resolution,
};
use crate::decision::Decision;
use crate::signature::SignatureVerification;

/// Stateless revocation workflow engine.
pub struct RevocationEngine;

impl RevocationEngine {
    /// Opens a revocation request against `decision`.
    ///
    /// The request starts in `PendingVerification` when a document is
    /// supplied and in `Pending` otherwise. Duplicate approvers are
    /// collapsed, keeping first occurrence order.
    ///
    /// # Errors
    ///
    /// * `DecisionNotRevocable` if the decision is revoked or already has an
    ///   open request
    /// * `ReasonRequired` if the reason is blank
    /// * `NoRequiredApprovers` if no approver is given
    pub fn create(
        decision: &Decision,
        input: NewRevocationRequest,
        now: DateTime<Utc>,
    ) -> Result<Transition, RevocationError> {
        if !decision.status.accepts_revocation() {
            return Err(RevocationError::DecisionNotRevocable(decision.status));
        }

        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(RevocationError::ReasonRequired);
        }

        let mut required_approvers: Vec<UserId> = Vec::with_capacity(input.required_approvers.len());
        for approver in input.required_approvers {
            if !required_approvers.contains(&approver) {
                required_approvers.push(approver);
            }
        }
        if required_approvers.is_empty() {
            return Err(RevocationError::NoRequiredApprovers);
        }

        let status = if input.document.is_some() {
            RevocationStatus::PendingVerification
        } else {
            RevocationStatus::Pending
        };

        let request = RevocationRequest {
            id: input.id,
            decision_id: decision.id,
            business_profile_id: input.business_profile_id,
            reason: reason.to_string(),
            requested_by: input.requested_by,
            requested_at: now,
            required_approvers,
            document: input.document,
            signature_verification: None,
            approvals: Vec::new(),
            status,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            version: 0,
            updated_at: now,
        };

        Ok(Transition {
            decision_status: project(None, status),
            request,
        })
    }

    /// Attaches or replaces the document and moves to `PendingVerification`.
    ///
    /// A previous verification snapshot belongs to the old document and is
    /// dropped.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is `Pending` or
    ///   `PendingVerification`
    pub fn attach_document(
        mut request: RevocationRequest,
        document: DocumentRef,
        now: DateTime<Utc>,
    ) -> Result<Transition, RevocationError> {
        let from = Self::ensure_allowed(&request, RevocationAction::UploadDocument)?;

        request.document = Some(document);
        request.signature_verification = None;
        request.status = RevocationStatus::PendingVerification;
        request.updated_at = now;

        Ok(Self::finish(from, request))
    }

    /// Stores a verification snapshot.
    ///
    /// A valid signature moves the request to `Verified`; anything else sends
    /// it back to `Pending` so a new document can be supplied.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is `PendingVerification`
    pub fn record_verification(
        mut request: RevocationRequest,
        verification: SignatureVerification,
        now: DateTime<Utc>,
    ) -> Result<Transition, RevocationError> {
        let from = Self::ensure_allowed(&request, RevocationAction::StoreVerification)?;

        request.status = if verification.is_valid() {
            RevocationStatus::Verified
        } else {
            RevocationStatus::Pending
        };
        request.signature_verification = Some(verification);
        request.updated_at = now;

        Ok(Self::finish(from, request))
    }

    /// Records one approval; the approval completing the quorum resolves the
    /// request as `Approved`.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is `Verified`
    /// * `NotRequiredApprover` if the user is not on the approver list
    /// * `DuplicateApproval` if the user already approved
    /// * `UnverifiedSignature` if the quorum would complete without a valid
    ///   document signature; the approval is not recorded
    pub fn approve(
        mut request: RevocationRequest,
        user_id: UserId,
        signature: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, RevocationError> {
        let from = Self::ensure_allowed(&request, RevocationAction::Approve)?;

        if !request.is_required_approver(user_id) {
            return Err(RevocationError::NotRequiredApprover(user_id));
        }
        if request.has_approved(user_id) {
            return Err(RevocationError::DuplicateApproval(user_id));
        }

        request.approvals.push(Approval {
            user_id,
            approved_at: now,
            signature: normalize_text(signature),
        });

        if request.quorum_reached() {
            if !request.signature_valid() {
                return Err(RevocationError::UnverifiedSignature);
            }
            request.status = RevocationStatus::Approved;
            request.resolved_at = Some(now);
            request.resolved_by = Some(user_id);
        }
        request.updated_at = now;

        Ok(Self::finish(from, request))
    }

    /// Rejects the request.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is `PendingVerification` or
    ///   `Verified`
    /// * `NotRequiredApprover` if the user is not on the approver list
    pub fn reject(
        mut request: RevocationRequest,
        user_id: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Transition, RevocationError> {
        let from = Self::ensure_allowed(&request, RevocationAction::Reject)?;

        if !request.is_required_approver(user_id) {
            return Err(RevocationError::NotRequiredApprover(user_id));
        }

        request.status = RevocationStatus::Rejected;
        request.resolved_at = Some(now);
        request.resolved_by = Some(user_id);
        request.resolution_notes = normalize_text(notes);
        request.updated_at = now;

        Ok(Self::finish(from, request))
    }

    /// Cancels the request, returning the decision to `Active`.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` unless the request is `PendingVerification` or
    ///   `Verified`
    /// * `NotRequester` if the user did not open the request
    pub fn cancel(
        mut request: RevocationRequest,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Transition, RevocationError> {
        let from = Self::ensure_allowed(&request, RevocationAction::Cancel)?;

        if request.requested_by != user_id {
            return Err(RevocationError::NotRequester);
        }

        request.status = RevocationStatus::Cancelled;
        request.resolved_at = Some(now);
        request.resolved_by = Some(user_id);
        request.updated_at = now;

        Ok(Self::finish(from, request))
    }

    /// Check if `action` is allowed from `status`.
    ///
    /// - upload document: Pending, PendingVerification
    /// - store verification: PendingVerification
    /// - approve: Verified
    /// - reject, cancel: PendingVerification, Verified
    #[must_use]
    pub fn is_allowed(status: RevocationStatus, action: RevocationAction) -> bool {
        match action {
            RevocationAction::UploadDocument => matches!(
                status,
                RevocationStatus::Pending | RevocationStatus::PendingVerification
            ),
            RevocationAction::StoreVerification => status == RevocationStatus::PendingVerification,
            RevocationAction::Approve => status == RevocationStatus::Verified,
            RevocationAction::Reject | RevocationAction::Cancel => is_open_for_resolution(status),
        }
    }

    /// Fails with `InvalidTransition` when `action` is not allowed; returns
    /// the current status otherwise.
    ///
    /// # Errors
    ///
    /// * `InvalidTransition` if the action is not allowed from the current
    ///   status
    pub fn ensure_allowed(
        request: &RevocationRequest,
        action: RevocationAction,
    ) -> Result<RevocationStatus, RevocationError> {
        if Self::is_allowed(request.status, action) {
            Ok(request.status)
        } else {
            Err(RevocationError::invalid_transition(request.status, action))
        }
    }

    fn finish(from: RevocationStatus, request: RevocationRequest) -> Transition {
        Transition {
            decision_status: project(Some(from), request.status),
            request,
        }
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
