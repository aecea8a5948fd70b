//! Decision repository for database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};

use uchwala_core::decision::{CreateDecisionInput, Decision, DecisionError, DecisionStatus};
use uchwala_shared::types::{BusinessProfileId, DecisionId, PageRequest, PageResponse, UserId};

use crate::entities::{decisions, sea_orm_active_enums::DecisionStatus as DbDecisionStatus};
use crate::rls::RlsExt;

/// Decision repository implementation.
#[derive(Debug, Clone)]
pub struct DecisionRepository {
    db: DatabaseConnection,
}

impl DecisionRepository {
    /// Creates a new decision repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a new decision in `active` status.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Number or title is blank
    /// - Number is already used in the business profile
    /// - Database operation fails
    pub async fn create(&self, input: CreateDecisionInput) -> Result<Decision, DecisionError> {
        let input = input.normalized()?;
        let now = Utc::now();

        let rls = self
            .db
            .with_rls(input.business_profile_id)
            .await
            .map_err(db_err)?;

        let active_model = decisions::ActiveModel {
            id: Set(DecisionId::new().into_inner()),
            business_profile_id: Set(input.business_profile_id.into_inner()),
            number: Set(input.number.clone()),
            title: Set(input.title),
            content: Set(input.content),
            adopted_on: Set(input.adopted_on),
            status: Set(DbDecisionStatus::Active),
            created_by: Set(input.created_by.into_inner()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let model = match active_model.insert(rls.transaction()).await {
            Ok(model) => model,
            Err(e) => {
                return Err(match e.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        DecisionError::DuplicateNumber(input.number)
                    }
                    _ => db_err(e),
                });
            }
        };

        rls.commit().await.map_err(db_err)?;
        Ok(to_domain(model))
    }

    /// Finds a decision by ID.
    ///
    /// # Errors
    ///
    /// Returns `DecisionError::NotFound` if it does not exist in the
    /// business profile.
    pub async fn find(
        &self,
        business_profile_id: BusinessProfileId,
        id: DecisionId,
    ) -> Result<Decision, DecisionError> {
        self.find_optional(business_profile_id, id)
            .await?
            .ok_or(DecisionError::NotFound(id))
    }

    /// Finds a decision by ID, returning `None` when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn find_optional(
        &self,
        business_profile_id: BusinessProfileId,
        id: DecisionId,
    ) -> Result<Option<Decision>, DecisionError> {
        let rls = self.db.with_rls(business_profile_id).await.map_err(db_err)?;
        let model = decisions::Entity::find_by_id(id.into_inner())
            .filter(decisions::Column::BusinessProfileId.eq(business_profile_id.into_inner()))
            .one(rls.transaction())
            .await
            .map_err(db_err)?;
        rls.commit().await.map_err(db_err)?;

        Ok(model.map(to_domain))
    }

    /// Lists decisions, most recently adopted first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(
        &self,
        business_profile_id: BusinessProfileId,
        status: Option<DecisionStatus>,
        page: PageRequest,
    ) -> Result<PageResponse<Decision>, DecisionError> {
        let page = page.clamped();
        let rls = self.db.with_rls(business_profile_id).await.map_err(db_err)?;

        let mut query = decisions::Entity::find()
            .filter(decisions::Column::BusinessProfileId.eq(business_profile_id.into_inner()));
        if let Some(status) = status {
            query = query.filter(decisions::Column::Status.eq(to_db_status(status)));
        }

        let (total, models) = {
            let paginator = query
                .order_by_desc(decisions::Column::AdoptedOn)
                .order_by_desc(decisions::Column::CreatedAt)
                .paginate(rls.transaction(), page.limit());
            let total = paginator.num_items().await.map_err(db_err)?;
            let models = paginator
                .fetch_page(u64::from(page.page - 1))
                .await
                .map_err(db_err)?;
            (total, models)
        };
        rls.commit().await.map_err(db_err)?;

        Ok(PageResponse::new(
            models.into_iter().map(to_domain).collect(),
            page,
            total,
        ))
    }
}

fn db_err(e: DbErr) -> DecisionError {
    DecisionError::repository(e.to_string())
}

/// Convert domain decision status to database enum.
pub(crate) fn to_db_status(status: DecisionStatus) -> DbDecisionStatus {
    match status {
        DecisionStatus::Active => DbDecisionStatus::Active,
        DecisionStatus::RevokeRequested => DbDecisionStatus::RevokeRequested,
        DecisionStatus::Revoked => DbDecisionStatus::Revoked,
        DecisionStatus::RevokeRejected => DbDecisionStatus::RevokeRejected,
    }
}

/// Convert database decision status to domain enum.
pub(crate) fn from_db_status(status: DbDecisionStatus) -> DecisionStatus {
    match status {
        DbDecisionStatus::Active => DecisionStatus::Active,
        DbDecisionStatus::RevokeRequested => DecisionStatus::RevokeRequested,
        DbDecisionStatus::Revoked => DecisionStatus::Revoked,
        DbDecisionStatus::RevokeRejected => DecisionStatus::RevokeRejected,
    }
}

/// Convert database model to domain model.
pub(crate) fn to_domain(model: decisions::Model) -> Decision {
    Decision {
        id: DecisionId::from_uuid(model.id),
        business_profile_id: BusinessProfileId::from_uuid(model.business_profile_id),
        number: model.number,
        title: model.title,
        content: model.content,
        adopted_on: model.adopted_on,
        status: from_db_status(model.status),
        created_by: UserId::from_uuid(model.created_by),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
