//! Authentication claims carried by bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BusinessProfileId, UserId};

/// JWT claims for access tokens.
///
/// Tokens are issued by the identity provider; this service only validates
/// them and scopes every query to `bp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: UserId,
    /// Business profile the user is acting for.
    pub bp: BusinessProfileId,
    /// User's role within the business profile.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: UserId,
        business_profile_id: BusinessProfileId,
        role: &str,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id,
            bp: business_profile_id,
            role: role.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.sub
    }

    /// Returns the business profile ID from claims.
    #[must_use]
    pub const fn business_profile_id(&self) -> BusinessProfileId {
        self.bp
    }
}
