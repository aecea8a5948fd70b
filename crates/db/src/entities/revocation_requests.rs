//! `SeaORM` Entity for revocation_requests table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::RevocationStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "revocation_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub decision_id: Uuid,
    pub business_profile_id: Uuid,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub requested_by: Uuid,
    pub requested_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "JsonBinary")]
    pub required_approvers: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub approvals: Json,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub signature_verification: Option<Json>,
    #[sea_orm(column_type = "Text", nullable)]
    pub document_url: Option<String>,
    pub document_name: Option<String>,
    pub document_storage_key: Option<String>,
    pub document_content_type: Option<String>,
    pub document_size: Option<i64>,
    pub document_uploaded_by: Option<Uuid>,
    pub document_uploaded_at: Option<DateTimeWithTimeZone>,
    pub status: RevocationStatus,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    pub resolved_by: Option<Uuid>,
    #[sea_orm(column_type = "Text", nullable)]
    pub resolution_notes: Option<String>,
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::decisions::Entity",
        from = "Column::DecisionId",
        to = "super::decisions::Column::Id"
    )]
    Decisions,
}

impl Related<super::decisions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Decisions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
