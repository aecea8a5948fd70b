//! Persistence contract for revocation requests.

use std::future::Future;

use uchwala_shared::types::{BusinessProfileId, DecisionId, RevocationRequestId};

use super::error::RevocationError;
use super::types::{RevocationRequest, Transition};
use crate::decision::Decision;

/// Repository trait for revocation requests.
///
/// Implemented by the db crate. `insert` and `update` write the request and
/// the projected decision status as one unit: either both land or neither
/// does.
pub trait RevocationStore: Send + Sync {
    /// Load the decision a request targets.
    fn find_decision(
        &self,
        business_profile_id: BusinessProfileId,
        decision_id: DecisionId,
    ) -> impl Future<Output = Result<Option<Decision>, RevocationError>> + Send;

    /// Find a request by ID.
    fn find(
        &self,
        business_profile_id: BusinessProfileId,
        id: RevocationRequestId,
    ) -> impl Future<Output = Result<Option<RevocationRequest>, RevocationError>> + Send;

    /// List the requests for a decision, newest first.
    fn list_for_decision(
        &self,
        business_profile_id: BusinessProfileId,
        decision_id: DecisionId,
    ) -> impl Future<Output = Result<Vec<RevocationRequest>, RevocationError>> + Send;

    /// Persist a newly created request.
    ///
    /// Must fail with `DecisionNotRevocable` if the decision no longer
    /// accepts a revocation by the time the write happens.
    fn insert(
        &self,
        transition: Transition,
    ) -> impl Future<Output = Result<RevocationRequest, RevocationError>> + Send;

    /// Persist a transition of an existing request.
    ///
    /// The write only applies if the stored version still equals
    /// `transition.request.version`; the stored version is then bumped by
    /// one. Fails with `ConcurrentModification` otherwise.
    fn update(
        &self,
        transition: Transition,
    ) -> impl Future<Output = Result<RevocationRequest, RevocationError>> + Send;
}
