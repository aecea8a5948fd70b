//! Property-based tests for RevocationEngine.

use chrono::Utc;
use proptest::prelude::*;
use uchwala_shared::types::UserId;
use uuid::Uuid;

use crate::decision::DecisionStatus;
use crate::revocation::engine::RevocationEngine;
use crate::revocation::engine::fixtures::{decision, document, new_request, verification};
use crate::revocation::error::RevocationError;
use crate::revocation::types::{RevocationAction, RevocationRequest, RevocationStatus};

/// Strategy for generating random RevocationStatus values.
fn arb_status() -> impl Strategy<Value = RevocationStatus> {
    prop_oneof![
        Just(RevocationStatus::Pending),
        Just(RevocationStatus::PendingVerification),
        Just(RevocationStatus::Verified),
        Just(RevocationStatus::Approved),
        Just(RevocationStatus::Rejected),
        Just(RevocationStatus::Cancelled),
    ]
}

fn arb_action() -> impl Strategy<Value = RevocationAction> {
    prop_oneof![
        Just(RevocationAction::UploadDocument),
        Just(RevocationAction::StoreVerification),
        Just(RevocationAction::Approve),
        Just(RevocationAction::Reject),
        Just(RevocationAction::Cancel),
    ]
}

fn arb_user_id() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

/// Approver lists of 1..6 users, possibly with duplicates.
fn arb_approvers() -> impl Strategy<Value = Vec<UserId>> {
    prop::collection::vec(0u8..6, 1..8).prop_map(|picks| {
        let pool: Vec<UserId> = (1..=6u128)
            .map(|n| UserId::from_uuid(Uuid::from_u128(n)))
            .collect();
        picks.into_iter().map(|i| pool[i as usize]).collect()
    })
}

/// A verified request with the given approvers; requester is not an approver.
fn verified(approvers: Vec<UserId>) -> RevocationRequest {
    let decision = decision(DecisionStatus::Active);
    let requester = UserId::from_uuid(Uuid::from_u128(u128::MAX));
    let created = RevocationEngine::create(
        &decision,
        new_request(&decision, requester, approvers, Some(document(requester))),
        Utc::now(),
    )
    .unwrap();
    RevocationEngine::record_verification(created.request, verification(true), Utc::now())
        .unwrap()
        .request
}

fn run(
    request: RevocationRequest,
    action: RevocationAction,
    user: UserId,
) -> Result<crate::revocation::types::Transition, RevocationError> {
    let now = Utc::now();
    match action {
        RevocationAction::UploadDocument => {
            RevocationEngine::attach_document(request, document(user), now)
        }
        RevocationAction::StoreVerification => {
            RevocationEngine::record_verification(request, verification(true), now)
        }
        RevocationAction::Approve => RevocationEngine::approve(request, user, None, now),
        RevocationAction::Reject => RevocationEngine::reject(request, user, None, now),
        RevocationAction::Cancel => RevocationEngine::cancel(request, user, now),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Required approvers never contain duplicates and keep first-seen order.
    #[test]
    fn prop_create_dedupes_approvers(approvers in arb_approvers()) {
        let request = verified(approvers.clone());
        let mut expected: Vec<UserId> = Vec::new();
        for a in approvers {
            if !expected.contains(&a) {
                expected.push(a);
            }
        }
        prop_assert_eq!(request.required_approvers, expected);
    }

    /// Approving in any order reaches `Approved` exactly on the last
    /// distinct approver, with one approval per approver.
    #[test]
    fn prop_quorum_completes_on_last_approver(
        approvers in arb_approvers(),
        seed in any::<u64>(),
    ) {
        let mut request = verified(approvers);
        let mut order = request.required_approvers.clone();
        let len = order.len();
        order.rotate_left((seed as usize) % len);

        for (idx, user) in order.iter().enumerate() {
            let t = RevocationEngine::approve(request, *user, None, Utc::now()).unwrap();
            request = t.request;
            if idx + 1 < len {
                prop_assert_eq!(request.status, RevocationStatus::Verified);
                prop_assert_eq!(t.decision_status, None);
            } else {
                prop_assert_eq!(request.status, RevocationStatus::Approved);
                prop_assert_eq!(t.decision_status, Some(DecisionStatus::Revoked));
            }
        }
        prop_assert_eq!(request.approvals.len(), len);
        prop_assert!(request.pending_approvers().is_empty());
    }

    /// A second approval by the same user always fails and appends nothing.
    #[test]
    fn prop_duplicate_approval_rejected(approvers in arb_approvers()) {
        let request = verified(approvers);
        prop_assume!(request.required_approvers.len() > 1);
        let user = request.required_approvers[0];

        let once = RevocationEngine::approve(request, user, None, Utc::now()).unwrap().request;
        let result = RevocationEngine::approve(once.clone(), user, None, Utc::now());
        prop_assert!(matches!(result, Err(RevocationError::DuplicateApproval(u)) if u == user));
        prop_assert_eq!(once.approvals.len(), 1);
    }

    /// Every action the allow-table refuses fails with InvalidTransition and
    /// every allowed one passes the status gate.
    #[test]
    fn prop_status_gate_matches_table(
        status in arb_status(),
        action in arb_action(),
    ) {
        let mut request = verified(vec![UserId::from_uuid(Uuid::from_u128(1))]);
        request.status = status;
        // Requester for cancel, approver for approve and reject.
        let user = match action {
            RevocationAction::Cancel => request.requested_by,
            _ => request.required_approvers[0],
        };

        let result = run(request, action, user);
        if RevocationEngine::is_allowed(status, action) {
            prop_assert!(result.is_ok(), "{action} from {status} failed: {result:?}");
        } else {
            let is_invalid_transition = matches!(
                result,
                Err(RevocationError::InvalidTransition { from, action: a })
                    if from == status && a == action
            );
            prop_assert!(is_invalid_transition);
        }
    }

    /// Terminal requests accept no action from anyone.
    #[test]
    fn prop_terminal_is_final(
        action in arb_action(),
        user in arb_user_id(),
        terminal in prop_oneof![
            Just(RevocationStatus::Approved),
            Just(RevocationStatus::Rejected),
            Just(RevocationStatus::Cancelled),
        ],
    ) {
        let mut request = verified(vec![user]);
        request.status = terminal;
        prop_assert!(run(request, action, user).is_err());
    }

    /// A decision projection is emitted exactly when a request reaches a
    /// terminal status.
    #[test]
    fn prop_projection_only_on_terminal(
        status in arb_status(),
        action in arb_action(),
    ) {
        let mut request = verified(vec![UserId::from_uuid(Uuid::from_u128(1))]);
        request.status = status;
        let user = match action {
            RevocationAction::Cancel => request.requested_by,
            _ => request.required_approvers[0],
        };

        if let Ok(t) = run(request, action, user) {
            prop_assert_eq!(t.decision_status.is_some(), t.request.status.is_terminal());
            prop_assert_eq!(t.request.resolved_at.is_some(), t.request.status.is_terminal());
        }
    }
}
