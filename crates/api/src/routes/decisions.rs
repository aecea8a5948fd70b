//! Decision routes.
//!
//! Decisions are recorded here; their status is only ever changed by the
//! revocation workflow.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::revocations::{RevocationResponse, read_document};
use crate::{AppState, error::ApiError, middleware::AuthUser};
use uchwala_core::decision::{CreateDecisionInput, Decision, DecisionStatus};
use uchwala_core::revocation::{CreateRevocationInput, DocumentUpload};
use uchwala_shared::types::{DecisionId, PageRequest, PageResponse, UserId};

/// Creates the decision routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/decisions", get(list_decisions).post(create_decision))
        .route("/decisions/{decision_id}", get(get_decision))
        .route(
            "/decisions/{decision_id}/revocations",
            get(list_revocations).post(create_revocation),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for recording a decision.
#[derive(Debug, Deserialize)]
pub struct CreateDecisionRequest {
    /// Registry number, e.g. `3/2026`.
    pub number: String,
    /// Short title.
    pub title: String,
    /// Full text.
    #[serde(default)]
    pub content: Option<String>,
    /// Adoption date (YYYY-MM-DD).
    pub adopted_on: NaiveDate,
}

/// Query parameters for listing decisions.
#[derive(Debug, Deserialize)]
pub struct ListDecisionsQuery {
    /// Filter by status.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// JSON part `payload` of a revocation request upload.
#[derive(Debug, Deserialize)]
pub struct CreateRevocationRequest {
    /// Why the decision should be revoked.
    pub reason: String,
    /// Users whose approval is required, in order.
    pub required_approvers: Vec<UserId>,
}

/// Response for a decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    /// Decision ID.
    pub id: Uuid,
    /// Registry number.
    pub number: String,
    /// Short title.
    pub title: String,
    /// Full text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Adoption date.
    pub adopted_on: NaiveDate,
    /// Current status.
    pub status: DecisionStatus,
    /// Author.
    pub created_by: Uuid,
    /// Created at timestamp (ISO 8601).
    pub created_at: String,
    /// Updated at timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            id: decision.id.into_inner(),
            number: decision.number,
            title: decision.title,
            content: decision.content,
            adopted_on: decision.adopted_on,
            status: decision.status,
            created_by: decision.created_by.into_inner(),
            created_at: decision.created_at.to_rfc3339(),
            updated_at: decision.updated_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_status(status: Option<&str>) -> Result<Option<DecisionStatus>, ApiError> {
    status
        .map(|s| {
            DecisionStatus::parse(s).ok_or_else(|| {
                ApiError::bad_request("INVALID_STATUS", format!("unknown decision status '{s}'"))
            })
        })
        .transpose()
}

fn page_request(query: &ListDecisionsQuery) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest {
        page: query.page.unwrap_or(defaults.page),
        per_page: query.per_page.unwrap_or(defaults.per_page),
    }
    .clamped()
}

/// Reads the `payload` and optional `file` parts of a revocation upload.
async fn read_revocation_form(
    mut multipart: Multipart,
) -> Result<(CreateRevocationRequest, Option<DocumentUpload>), ApiError> {
    let mut payload = None;
    let mut document = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("payload") => {
                let text = field.text().await?;
                payload = Some(serde_json::from_str(&text).map_err(|e| {
                    ApiError::bad_request("INVALID_PAYLOAD", format!("invalid payload: {e}"))
                })?);
            }
            Some("file") => document = Some(read_document(field).await?),
            _ => {}
        }
    }

    let payload = payload
        .ok_or_else(|| ApiError::bad_request("INVALID_PAYLOAD", "missing 'payload' part"))?;
    Ok((payload, document))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/decisions`
async fn create_decision(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateDecisionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let decision = state
        .decisions()
        .create(CreateDecisionInput {
            business_profile_id: auth.business_profile_id(),
            number: payload.number,
            title: payload.title,
            content: payload.content,
            adopted_on: payload.adopted_on,
            created_by: auth.user_id(),
        })
        .await?;

    info!(
        decision_id = %decision.id,
        number = %decision.number,
        "Decision recorded"
    );
    Ok((StatusCode::CREATED, Json(DecisionResponse::from(decision))))
}

/// GET `/decisions`
async fn list_decisions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListDecisionsQuery>,
) -> Result<Json<PageResponse<DecisionResponse>>, ApiError> {
    let status = parse_status(query.status.as_deref())?;
    let page = state
        .decisions()
        .list(auth.business_profile_id(), status, page_request(&query))
        .await?;

    Ok(Json(page.map(DecisionResponse::from)))
}

/// GET `/decisions/{decision_id}`
async fn get_decision(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(decision_id): Path<Uuid>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let decision = state
        .decisions()
        .find(auth.business_profile_id(), DecisionId::from_uuid(decision_id))
        .await?;

    Ok(Json(decision.into()))
}

/// GET `/decisions/{decision_id}/revocations`
async fn list_revocations(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(decision_id): Path<Uuid>,
) -> Result<Json<Vec<RevocationResponse>>, ApiError> {
    let requests = state
        .revocations()
        .list_for_decision(auth.business_profile_id(), DecisionId::from_uuid(decision_id))
        .await?;

    let viewer = auth.user_id();
    Ok(Json(
        requests
            .into_iter()
            .map(|request| RevocationResponse::for_viewer(request, viewer))
            .collect(),
    ))
}

/// POST `/decisions/{decision_id}/revocations`
///
/// Multipart body: JSON part `payload` and an optional `file` part with the
/// revoking resolution.
async fn create_revocation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(decision_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (payload, document) = read_revocation_form(multipart).await?;

    let request = state
        .revocations()
        .create(CreateRevocationInput {
            business_profile_id: auth.business_profile_id(),
            decision_id: DecisionId::from_uuid(decision_id),
            reason: payload.reason,
            requested_by: auth.user_id(),
            required_approvers: payload.required_approvers,
            document,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RevocationResponse::for_viewer(request, auth.user_id())),
    ))
}
