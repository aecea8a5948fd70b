//! Revocation request routes.
//!
//! Every transition goes through the revocation service, which persists the
//! request and the decision status together.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State, multipart::Field},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use uchwala_core::revocation::{Approval, DocumentUpload, RevocationRequest, RevocationStatus};
use uchwala_core::signature::SignatureVerification;
use uchwala_core::storage::DocumentKind;
use uchwala_shared::types::{RevocationRequestId, UserId};

/// Filename used when the client sends none.
const DEFAULT_FILENAME: &str = "document";

/// Role of the service account that delivers out-of-band verification
/// results. Users cannot write verification snapshots.
pub const VERIFIER_ROLE: &str = "verifier";

/// Creates the revocation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/revocations/{revocation_id}", get(get_revocation))
        .route("/revocations/{revocation_id}/document", post(upload_document))
        .route("/revocations/{revocation_id}/verify", post(verify_document))
        .route(
            "/revocations/{revocation_id}/verification",
            put(store_verification),
        )
        .route("/revocations/{revocation_id}/approvals", post(approve))
        .route("/revocations/{revocation_id}/reject", post(reject))
        .route("/revocations/{revocation_id}/cancel", post(cancel))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for an approval.
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    /// Optional signature token recorded with the approval.
    #[serde(default)]
    pub signature: Option<String>,
}

/// Request body for a rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    /// Optional explanation.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Stored document metadata.
#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    /// Original filename.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Uploader.
    pub uploaded_by: Uuid,
    /// Upload timestamp (ISO 8601).
    pub uploaded_at: String,
}

/// Response for a revocation request, including what the caller may do next.
#[derive(Debug, Serialize)]
pub struct RevocationResponse {
    /// Request ID.
    pub id: Uuid,
    /// Decision being revoked.
    pub decision_id: Uuid,
    /// Reason given by the requester.
    pub reason: String,
    /// Requester.
    pub requested_by: Uuid,
    /// Created at timestamp (ISO 8601).
    pub requested_at: String,
    /// Current status.
    pub status: RevocationStatus,
    /// Users whose approval is required, in order.
    pub required_approvers: Vec<UserId>,
    /// Required approvers who have not approved yet.
    pub pending_approvers: Vec<UserId>,
    /// Approvals in the order they were given.
    pub approvals: Vec<Approval>,
    /// Revoking resolution document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentResponse>,
    /// Latest signature verification result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_verification: Option<SignatureVerification>,
    /// Resolved at timestamp (ISO 8601).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
    /// User who resolved the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Uuid>,
    /// Rejection notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    /// Optimistic lock version.
    pub version: i32,
    /// The caller may approve now.
    pub can_approve: bool,
    /// The caller may reject now.
    pub can_reject: bool,
    /// The caller may cancel now.
    pub can_cancel: bool,
}

impl RevocationResponse {
    /// Builds the response as seen by `viewer`.
    #[must_use]
    pub fn for_viewer(request: RevocationRequest, viewer: UserId) -> Self {
        let can_approve = request.can_approve(viewer);
        let can_reject = request.can_reject(viewer);
        let can_cancel = request.can_cancel(viewer);
        let pending_approvers = request.pending_approvers();

        Self {
            id: request.id.into_inner(),
            decision_id: request.decision_id.into_inner(),
            reason: request.reason,
            requested_by: request.requested_by.into_inner(),
            requested_at: request.requested_at.to_rfc3339(),
            status: request.status,
            required_approvers: request.required_approvers,
            pending_approvers,
            approvals: request.approvals,
            document: request.document.map(|d| DocumentResponse {
                name: d.name,
                url: d.url,
                content_type: d.content_type,
                size: d.size,
                uploaded_by: d.uploaded_by.into_inner(),
                uploaded_at: d.uploaded_at.to_rfc3339(),
            }),
            signature_verification: request.signature_verification,
            resolved_at: request.resolved_at.map(|t| t.to_rfc3339()),
            resolved_by: request.resolved_by.map(UserId::into_inner),
            resolution_notes: request.resolution_notes,
            version: request.version,
            can_approve,
            can_reject,
            can_cancel,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Reads a multipart file part into an upload.
///
/// A missing `Content-Type` falls back to the type recognised from the
/// leading bytes; storage validation decides whether it is acceptable.
pub(crate) async fn read_document(field: Field<'_>) -> Result<DocumentUpload, ApiError> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    let declared = field.content_type().map(str::to_string);
    let content = field.bytes().await?.to_vec();

    let content_type = declared
        .or_else(|| DocumentKind::sniff(&content).map(|kind| kind.mime_type().to_string()))
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(DocumentUpload {
        filename,
        content_type,
        content,
    })
}

async fn read_file_part(mut multipart: Multipart) -> Result<DocumentUpload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            return read_document(field).await;
        }
    }
    Err(ApiError::bad_request(
        "INVALID_DOCUMENT",
        "missing 'file' part",
    ))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/revocations/{revocation_id}`
async fn get_revocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let request = state
        .revocations()
        .get(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

/// POST `/revocations/{revocation_id}/document`
async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<RevocationResponse>, ApiError> {
    let upload = read_file_part(multipart).await?;
    let request = state
        .revocations()
        .upload_document(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
            auth.user_id(),
            upload,
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

/// POST `/revocations/{revocation_id}/verify`
async fn verify_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let request = state
        .revocations()
        .verify_document(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

/// PUT `/revocations/{revocation_id}/verification`
///
/// Restricted to [`VERIFIER_ROLE`].
async fn store_verification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
    Json(verification): Json<SignatureVerification>,
) -> Result<Json<RevocationResponse>, ApiError> {
    auth.require_role(VERIFIER_ROLE)?;

    let request = state
        .revocations()
        .store_verification(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
            verification,
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

/// POST `/revocations/{revocation_id}/approvals`
async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let request = state
        .revocations()
        .approve(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
            auth.user_id(),
            payload.signature,
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

/// POST `/revocations/{revocation_id}/reject`
async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let request = state
        .revocations()
        .reject(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
            auth.user_id(),
            payload.notes,
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

/// POST `/revocations/{revocation_id}/cancel`
async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(revocation_id): Path<Uuid>,
) -> Result<Json<RevocationResponse>, ApiError> {
    let request = state
        .revocations()
        .cancel(
            auth.business_profile_id(),
            RevocationRequestId::from_uuid(revocation_id),
            auth.user_id(),
        )
        .await?;

    Ok(Json(RevocationResponse::for_viewer(request, auth.user_id())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uchwala_shared::types::{BusinessProfileId, DecisionId};

    fn request(requester: UserId, approvers: Vec<UserId>) -> RevocationRequest {
        let now = Utc::now();
        RevocationRequest {
            id: RevocationRequestId::new(),
            decision_id: DecisionId::new(),
            business_profile_id: BusinessProfileId::new(),
            reason: "Sprzeczna z umową spółki".to_string(),
            requested_by: requester,
            requested_at: now,
            required_approvers: approvers,
            document: None,
            signature_verification: None,
            approvals: Vec::new(),
            status: RevocationStatus::Verified,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            version: 2,
            updated_at: now,
        }
    }

    #[test]
    fn test_response_flags_follow_viewer() {
        let (requester, approver) = (UserId::new(), UserId::new());
        let mut req = request(requester, vec![approver]);
        req.signature_verification = Some(SignatureVerification {
            has_signature: true,
            crypto_valid: true,
            signer_subject: None,
            signing_time: None,
            notes: Vec::new(),
            verified_at: Utc::now(),
        });

        let as_approver = RevocationResponse::for_viewer(req.clone(), approver);
        assert!(as_approver.can_approve);
        assert!(as_approver.can_reject);
        assert!(!as_approver.can_cancel);
        assert_eq!(as_approver.pending_approvers, vec![approver]);

        let as_requester = RevocationResponse::for_viewer(req, requester);
        assert!(!as_requester.can_approve);
        assert!(!as_requester.can_reject);
        assert!(as_requester.can_cancel);
    }

    #[test]
    fn test_response_serializes_status_snake_case() {
        let mut req = request(UserId::new(), vec![UserId::new()]);
        req.status = RevocationStatus::PendingVerification;
        let json = serde_json::to_value(RevocationResponse::for_viewer(req, UserId::new())).unwrap();

        assert_eq!(json["status"], "pending_verification");
        assert_eq!(json["version"], 2);
        assert!(json.get("document").is_none());
        assert!(json.get("resolved_at").is_none());
    }

    #[test]
    fn test_empty_bodies_deserialize() {
        let approve: ApproveRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(approve.signature, None);
        let reject: RejectRequest = serde_json::from_str(r#"{"notes": "Brak podstaw"}"#).unwrap();
        assert_eq!(reject.notes.as_deref(), Some("Brak podstaw"));
    }
}
