//! Revocation request repository.
//!
//! Each write runs in one RLS-scoped transaction that updates the request
//! and, when the transition projects one, the parent decision's status.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use tracing::warn;
use uchwala_core::decision::{Decision, DecisionStatus};
use uchwala_core::revocation::{
    DocumentRef, RevocationError, RevocationRequest, RevocationStatus, RevocationStore, Transition,
};
use uchwala_shared::types::{BusinessProfileId, DecisionId, RevocationRequestId, UserId};

use super::decision::{to_db_status, to_domain as decision_to_domain};
use crate::entities::{
    decisions, revocation_requests,
    sea_orm_active_enums::{DecisionStatus as DbDecisionStatus, RevocationStatus as DbRevocationStatus},
};
use crate::rls::RlsExt;

/// Revocation request repository implementation.
#[derive(Debug, Clone)]
pub struct RevocationRepository {
    db: DatabaseConnection,
}

impl RevocationRepository {
    /// Creates a new revocation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Writes the projected decision status.
    ///
    /// With `require_revocable`, only a decision that still accepts a
    /// revocation is updated; zero affected rows means it does not.
    async fn project_decision(
        txn: &DatabaseTransaction,
        request: &RevocationRequest,
        status: DecisionStatus,
        require_revocable: bool,
    ) -> Result<u64, RevocationError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let changes = decisions::ActiveModel {
            status: Set(to_db_status(status)),
            updated_at: Set(now),
            ..Default::default()
        };

        let mut update = decisions::Entity::update_many()
            .set(changes)
            .filter(decisions::Column::Id.eq(request.decision_id.into_inner()))
            .filter(
                decisions::Column::BusinessProfileId.eq(request.business_profile_id.into_inner()),
            );
        if require_revocable {
            update = update.filter(
                decisions::Column::Status
                    .is_in([DbDecisionStatus::Active, DbDecisionStatus::RevokeRejected]),
            );
        }

        let result = update.exec(txn).await.map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

impl RevocationStore for RevocationRepository {
    async fn find_decision(
        &self,
        business_profile_id: BusinessProfileId,
        decision_id: DecisionId,
    ) -> Result<Option<Decision>, RevocationError> {
        let rls = self.db.with_rls(business_profile_id).await.map_err(db_err)?;
        let model = decisions::Entity::find_by_id(decision_id.into_inner())
            .filter(decisions::Column::BusinessProfileId.eq(business_profile_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(db_err)?;
        rls.commit().await.map_err(db_err)?;

        Ok(model.map(decision_to_domain))
    }

    async fn find(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
    ) -> Result<Option<RevocationRequest>, RevocationError> {
        let rls = self.db.with_rls(business_profile_id).await.map_err(db_err)?;
        let model = revocation_requests::Entity::find_by_id(id.into_inner())
            .filter(
                revocation_requests::Column::BusinessProfileId
                    .eq(business_profile_id.into_inner()),
            )
            .one(rls.transaction())
            .await
            .map_err(db_err)?;
        rls.commit().await.map_err(db_err)?;

        model.map(to_domain).transpose()
    }

    async fn list_for_decision(
        &self,
        business_profile_id: BusinessProfileId,
        decision_id: DecisionId,
    ) -> Result<Vec<RevocationRequest>, RevocationError> {
        let rls = self.db.with_rls(business_profile_id).await.map_err(db_err)?;
        let models = revocation_requests::Entity::find()
            .filter(
                revocation_requests::Column::BusinessProfileId
                    .eq(business_profile_id.into_inner()),
            )
            .filter(revocation_requests::Column::DecisionId.eq(decision_id.into_inner()))
            .order_by_desc(revocation_requests::Column::RequestedAt)
            .all(rls.transaction())
            .await
            .map_err(db_err)?;
        rls.commit().await.map_err(db_err)?;

        models.into_iter().map(to_domain).collect()
    }

    async fn insert(&self, transition: Transition) -> Result<RevocationRequest, RevocationError> {
        let request = transition.request;
        let rls = self
            .db
            .with_rls(request.business_profile_id)
            .await
            .map_err(db_err)?;
        let txn = rls.transaction();

        if let Some(status) = transition.decision_status {
            let affected = Self::project_decision(txn, &request, status, true).await?;
            if affected == 0 {
                let current = decisions::Entity::find_by_id(request.decision_id.into_inner())
                    .one(txn)
                    .await
                    .map_err(db_err)?;
                return Err(match current {
                    Some(model) => RevocationError::DecisionNotRevocable(
                        decision_to_domain(model).status,
                    ),
                    None => RevocationError::DecisionNotFound(request.decision_id),
                });
            }
        }

        let active_model = to_active_model(&request, request.version)?;
        if let Err(e) = active_model.insert(txn).await {
            return Err(match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    RevocationError::DecisionNotRevocable(DecisionStatus::RevokeRequested)
                }
                _ => db_err(e),
            });
        }

        rls.commit().await.map_err(db_err)?;
        Ok(request)
    }

    async fn update(&self, transition: Transition) -> Result<RevocationRequest, RevocationError> {
        let mut request = transition.request;
        let expected_version = request.version;
        let rls = self
            .db
            .with_rls(request.business_profile_id)
            .await
            .map_err(db_err)?;
        let txn = rls.transaction();

        let mut changes = to_active_model(&request, expected_version + 1)?;
        changes.id = ActiveValue::NotSet;
        changes.created_at = ActiveValue::NotSet;

        let result = revocation_requests::Entity::update_many()
            .set(changes)
            .filter(revocation_requests::Column::Id.eq(request.id.into_inner()))
            .filter(
                revocation_requests::Column::BusinessProfileId
                    .eq(request.business_profile_id.into_inner()),
            )
            .filter(revocation_requests::Column::Version.eq(expected_version))
            .exec(txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            let exists = revocation_requests::Entity::find_by_id(request.id.into_inner())
                .one(txn)
                .await
                .map_err(db_err)?
                .is_some();
            return Err(if exists {
                warn!(
                    revocation_id = %request.id,
                    expected_version,
                    "Revocation request version conflict"
                );
                RevocationError::ConcurrentModification(request.id)
            } else {
                RevocationError::NotFound(request.id)
            });
        }

        if let Some(status) = transition.decision_status {
            Self::project_decision(txn, &request, status, false).await?;
        }

        rls.commit().await.map_err(db_err)?;
        request.version = expected_version + 1;
        Ok(request)
    }
}

fn db_err(e: DbErr) -> RevocationError {
    RevocationError::repository(e.to_string())
}

fn json_err(e: serde_json::Error) -> RevocationError {
    RevocationError::repository(format!("malformed revocation json column: {e}"))
}

/// Convert domain revocation status to database enum.
fn to_db_revocation_status(status: RevocationStatus) -> DbRevocationStatus {
    match status {
        RevocationStatus::Pending => DbRevocationStatus::Pending,
        RevocationStatus::PendingVerification => DbRevocationStatus::PendingVerification,
        RevocationStatus::Verified => DbRevocationStatus::Verified,
        RevocationStatus::Approved => DbRevocationStatus::Approved,
        RevocationStatus::Rejected => DbRevocationStatus::Rejected,
        RevocationStatus::Cancelled => DbRevocationStatus::Cancelled,
    }
}

/// Convert database revocation status to domain enum.
fn from_db_revocation_status(status: DbRevocationStatus) -> RevocationStatus {
    match status {
        DbRevocationStatus::Pending => RevocationStatus::Pending,
        DbRevocationStatus::PendingVerification => RevocationStatus::PendingVerification,
        DbRevocationStatus::Verified => RevocationStatus::Verified,
        DbRevocationStatus::Approved => RevocationStatus::Approved,
        DbRevocationStatus::Rejected => RevocationStatus::Rejected,
        DbRevocationStatus::Cancelled => RevocationStatus::Cancelled,
    }
}

fn to_active_model(
    request: &RevocationRequest,
    version: i32,
) -> Result<revocation_requests::ActiveModel, RevocationError> {
    let document = request.document.as_ref();
    let signature_verification = request
        .signature_verification
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(json_err)?;

    Ok(revocation_requests::ActiveModel {
        id: Set(request.id.into_inner()),
        decision_id: Set(request.decision_id.into_inner()),
        business_profile_id: Set(request.business_profile_id.into_inner()),
        reason: Set(request.reason.clone()),
        requested_by: Set(request.requested_by.into_inner()),
        requested_at: Set(request.requested_at.into()),
        required_approvers: Set(serde_json::to_value(&request.required_approvers).map_err(json_err)?),
        approvals: Set(serde_json::to_value(&request.approvals).map_err(json_err)?),
        signature_verification: Set(signature_verification),
        document_url: Set(document.map(|d| d.url.clone())),
        document_name: Set(document.map(|d| d.name.clone())),
        document_storage_key: Set(document.map(|d| d.storage_key.clone())),
        document_content_type: Set(document.map(|d| d.content_type.clone())),
        document_size: Set(document.map(|d| i64::try_from(d.size).unwrap_or(i64::MAX))),
        document_uploaded_by: Set(document.map(|d| d.uploaded_by.into_inner())),
        document_uploaded_at: Set(document.map(|d| d.uploaded_at.into())),
        status: Set(to_db_revocation_status(request.status)),
        resolved_at: Set(request.resolved_at.map(Into::into)),
        resolved_by: Set(request.resolved_by.map(UserId::into_inner)),
        resolution_notes: Set(request.resolution_notes.clone()),
        version: Set(version),
        created_at: Set(request.requested_at.into()),
        updated_at: Set(request.updated_at.into()),
    })
}

/// Convert database model to domain model.
fn to_domain(model: revocation_requests::Model) -> Result<RevocationRequest, RevocationError> {
    let document = match (
        model.document_url,
        model.document_name,
        model.document_storage_key,
        model.document_content_type,
        model.document_size,
        model.document_uploaded_by,
        model.document_uploaded_at,
    ) {
        (
            Some(url),
            Some(name),
            Some(storage_key),
            Some(content_type),
            Some(size),
            Some(uploaded_by),
            Some(uploaded_at),
        ) => Some(DocumentRef {
            url,
            name,
            storage_key,
            content_type,
            size: u64::try_from(size).unwrap_or_default(),
            uploaded_by: UserId::from_uuid(uploaded_by),
            uploaded_at: uploaded_at.with_timezone(&Utc),
        }),
        _ => None,
    };

    Ok(RevocationRequest {
        id: RevocationRequestId::from_uuid(model.id),
        decision_id: DecisionId::from_uuid(model.decision_id),
        business_profile_id: BusinessProfileId::from_uuid(model.business_profile_id),
        reason: model.reason,
        requested_by: UserId::from_uuid(model.requested_by),
        requested_at: model.requested_at.with_timezone(&Utc),
        required_approvers: serde_json::from_value(model.required_approvers).map_err(json_err)?,
        document,
        signature_verification: model
            .signature_verification
            .map(serde_json::from_value)
            .transpose()
            .map_err(json_err)?,
        approvals: serde_json::from_value(model.approvals).map_err(json_err)?,
        status: from_db_revocation_status(model.status),
        resolved_at: model.resolved_at.map(|t| t.with_timezone(&Utc)),
        resolved_by: model.resolved_by.map(UserId::from_uuid),
        resolution_notes: model.resolution_notes,
        version: model.version,
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
