//! Decision domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uchwala_shared::types::{BusinessProfileId, DecisionId, UserId};

use super::error::DecisionError;

/// Lifecycle status of a decision.
///
/// `Active` is the only status set outside the revocation workflow; the
/// other three are projections of a revocation request's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// Decision is in force.
    Active,
    /// A revocation request is open.
    RevokeRequested,
    /// Decision was revoked by an approved revocation request.
    Revoked,
    /// The last revocation request was rejected.
    RevokeRejected,
}

impl DecisionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::RevokeRequested => "revoke_requested",
            Self::Revoked => "revoked",
            Self::RevokeRejected => "revoke_rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "revoke_requested" => Some(Self::RevokeRequested),
            "revoked" => Some(Self::Revoked),
            "revoke_rejected" => Some(Self::RevokeRejected),
            _ => None,
        }
    }

    /// Returns true if a new revocation request may be opened.
    #[must_use]
    pub fn accepts_revocation(&self) -> bool {
        matches!(self, Self::Active | Self::RevokeRejected)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A corporate decision (uchwała).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier.
    pub id: DecisionId,
    /// Owning business profile.
    pub business_profile_id: BusinessProfileId,
    /// Registry number, e.g. `3/2026`.
    pub number: String,
    /// Short title.
    pub title: String,
    /// Full text.
    pub content: Option<String>,
    /// Date the decision was adopted.
    pub adopted_on: NaiveDate,
    /// Current status.
    pub status: DecisionStatus,
    /// Author.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a decision.
#[derive(Debug, Clone)]
pub struct CreateDecisionInput {
    /// Owning business profile.
    pub business_profile_id: BusinessProfileId,
    /// Registry number.
    pub number: String,
    /// Short title.
    pub title: String,
    /// Full text.
    pub content: Option<String>,
    /// Date the decision was adopted.
    pub adopted_on: NaiveDate,
    /// Author.
    pub created_by: UserId,
}

impl CreateDecisionInput {
    /// Trims the text fields and checks the required ones are present.
    pub fn normalized(mut self) -> Result<Self, DecisionError> {
        self.number = self.number.trim().to_string();
        self.title = self.title.trim().to_string();
        self.content = self
            .content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        if self.number.is_empty() {
            return Err(DecisionError::NumberRequired);
        }
        if self.title.is_empty() {
            return Err(DecisionError::TitleRequired);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(number: &str, title: &str) -> CreateDecisionInput {
        CreateDecisionInput {
            business_profile_id: BusinessProfileId::new(),
            number: number.to_string(),
            title: title.to_string(),
            content: Some("   ".to_string()),
            adopted_on: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            created_by: UserId::new(),
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            DecisionStatus::Active,
            DecisionStatus::RevokeRequested,
            DecisionStatus::Revoked,
            DecisionStatus::RevokeRejected,
        ] {
            assert_eq!(DecisionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DecisionStatus::parse("archived"), None);
    }

    #[test]
    fn test_accepts_revocation() {
        assert!(DecisionStatus::Active.accepts_revocation());
        assert!(DecisionStatus::RevokeRejected.accepts_revocation());
        assert!(!DecisionStatus::RevokeRequested.accepts_revocation());
        assert!(!DecisionStatus::Revoked.accepts_revocation());
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_content() {
        let normalized = input("  3/2026 ", " Podział zysku ").normalized().unwrap();
        assert_eq!(normalized.number, "3/2026");
        assert_eq!(normalized.title, "Podział zysku");
        assert_eq!(normalized.content, None);
    }

    #[test]
    fn test_normalized_requires_number_and_title() {
        assert!(matches!(
            input(" ", "Title").normalized(),
            Err(DecisionError::NumberRequired)
        ));
        assert!(matches!(
            input("1/2026", "").normalized(),
            Err(DecisionError::TitleRequired)
        ));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&DecisionStatus::RevokeRequested).unwrap();
        assert_eq!(json, "\"revoke_requested\"");
    }
}
