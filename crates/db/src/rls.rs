//! Row-Level Security (RLS) context management.
//!
//! Every tenant table carries a `business_profile_id` and a policy that
//! compares it against the `app.current_business_profile_id` setting. The
//! repositories run their queries through [`RlsConnection`] so the setting
//! is always present.
//!
//! # Usage
//!
//! ```ignore
//! use uchwala_db::rls::RlsExt;
//!
//! let rls = db.with_rls(business_profile_id).await?;
//! let decisions = decisions::Entity::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use uchwala_shared::types::BusinessProfileId;

/// A database transaction with the business profile context set.
pub struct RlsConnection {
    txn: DatabaseTransaction,
}

impl RlsConnection {
    /// Begins a transaction and sets `app.current_business_profile_id` with
    /// `SET LOCAL`, so the setting ends with the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the context
    /// cannot be set.
    pub async fn new(
        db: &DatabaseConnection,
        business_profile_id: BusinessProfileId,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_rls_context(&txn, business_profile_id).await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits the transaction, persisting all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Rolls back the transaction, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Extension trait for `DatabaseConnection` to create RLS-scoped transactions.
#[async_trait::async_trait]
pub trait RlsExt {
    /// Creates an RLS-scoped transaction for the business profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the RLS connection cannot be created.
    async fn with_rls(&self, business_profile_id: BusinessProfileId)
    -> Result<RlsConnection, DbErr>;
}

#[async_trait::async_trait]
impl RlsExt for DatabaseConnection {
    async fn with_rls(
        &self,
        business_profile_id: BusinessProfileId,
    ) -> Result<RlsConnection, DbErr> {
        RlsConnection::new(self, business_profile_id).await
    }
}

/// Sets the RLS context on an existing transaction.
///
/// # Errors
///
/// Returns an error if the RLS context cannot be set.
pub async fn set_rls_context(
    txn: &DatabaseTransaction,
    business_profile_id: BusinessProfileId,
) -> Result<(), DbErr> {
    txn.execute_unprepared(&context_sql(business_profile_id))
        .await?;
    Ok(())
}

/// `SET LOCAL` cannot take bind parameters; the value is a formatted UUID so
/// it cannot carry quotes.
fn context_sql(business_profile_id: BusinessProfileId) -> String {
    format!("SET LOCAL app.current_business_profile_id = '{business_profile_id}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_rls_sql_format() {
        let id = BusinessProfileId::from_uuid(
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
        );
        assert_eq!(
            context_sql(id),
            "SET LOCAL app.current_business_profile_id = '550e8400-e29b-41d4-a716-446655440000'"
        );
    }
}
