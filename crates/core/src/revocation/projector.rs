//! Projection of revocation request status onto the parent decision.
//!
//! The decision's status is derived state: it changes only as a side
//! effect of a revocation request transition, in the same write.

use super::types::RevocationStatus;
use crate::decision::DecisionStatus;

/// Decision status to write when a request moves from `from` to `to`.
///
/// `from` is `None` for a freshly created request. Returns `None` when the
/// transition leaves the decision untouched.
#[must_use]
pub fn project(from: Option<RevocationStatus>, to: RevocationStatus) -> Option<DecisionStatus> {
    match (from, to) {
        (None, _) => Some(DecisionStatus::RevokeRequested),
        (Some(prev), next) if prev == next => None,
        (Some(_), RevocationStatus::Approved) => Some(DecisionStatus::Revoked),
        (Some(_), RevocationStatus::Rejected) => Some(DecisionStatus::RevokeRejected),
        (Some(_), RevocationStatus::Cancelled) => Some(DecisionStatus::Active),
        (
            Some(_),
            RevocationStatus::Pending
            | RevocationStatus::PendingVerification
            | RevocationStatus::Verified,
        ) => None,
    }
}
