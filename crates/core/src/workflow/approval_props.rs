//! Property-based tests for ApprovalMachine.
//!
//! Drives random chains with random decisions taken only by actionable rows
//! and checks the chain outcome against the rows.

use chrono::Utc;
use proptest::prelude::*;

use accrue_shared::types::{RequestId, UserId};

use crate::workflow::approval::ApprovalMachine;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Approval, ApprovalStatus, ChainOutcome, Decision};

#[derive(Debug, Clone, Copy)]
enum Move {
    Approve,
    Deny,
    Delegate,
}

fn arb_move() -> impl Strategy<Value = Move> {
    prop_oneof![
        6 => Just(Move::Approve),
        1 => Just(Move::Deny),
        2 => Just(Move::Delegate),
    ]
}

/// Levels of 1..=3 rows; each level is either all parallel or sequential.
fn arb_chain() -> impl Strategy<Value = Vec<Approval>> {
    prop::collection::vec((1usize..=3, any::<bool>()), 1..=4).prop_map(|levels| {
        let request_id = RequestId::new();
        let mut rows = Vec::new();
        for (level, (width, parallel)) in (1u32..).zip(levels) {
            for sequence in (1u32..).take(width) {
                let mut row =
                    Approval::pending(request_id, UserId::new(), level, sequence, parallel, Utc::now());
                if level == 1 {
                    row.activated_at = Some(Utc::now());
                }
                rows.push(row);
            }
        }
        rows
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Approved iff every required final row approved; denied iff any denied.
    #[test]
    fn prop_outcome_matches_rows(
        mut chain in arb_chain(),
        moves in prop::collection::vec((arb_move(), any::<prop::sample::Index>()), 1..30),
    ) {
        let requester = UserId::new();
        let mut outcome = ChainOutcome::Pending;

        for (mv, pick) in moves {
            if outcome != ChainOutcome::Pending {
                break;
            }
            let actionable: Vec<Approval> =
                ApprovalMachine::actionable(&chain).into_iter().cloned().collect();
            prop_assert!(!actionable.is_empty());
            let row = pick.get(&actionable);
            let decision = match mv {
                Move::Approve => Decision::Approve,
                Move::Deny => Decision::Deny,
                Move::Delegate => Decision::Delegate(UserId::new()),
            };
            let res = ApprovalMachine::resolve(
                &mut chain, row.id, row.approver_id, requester, decision, None, Utc::now(),
            );
            match res {
                Ok(r) => outcome = r.outcome,
                Err(WorkflowError::InvalidDelegation(_)) => {}
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }

        let counted: Vec<&Approval> = chain
            .iter()
            .filter(|a| a.is_required && !matches!(a.status, ApprovalStatus::Delegated | ApprovalStatus::Cancelled))
            .collect();
        let any_denied = counted.iter().any(|a| a.status == ApprovalStatus::Denied);
        let all_approved = counted.iter().all(|a| a.status == ApprovalStatus::Approved);

        match outcome {
            ChainOutcome::Denied => prop_assert!(any_denied),
            ChainOutcome::Approved => prop_assert!(all_approved && !any_denied),
            ChainOutcome::Pending => {
                prop_assert!(!any_denied && !all_approved);
                prop_assert!(!ApprovalMachine::actionable(&chain).is_empty());
            }
        }
        if outcome != ChainOutcome::Pending {
            prop_assert!(chain.iter().all(|a| !a.is_pending()));
        }
    }

    /// Two deliveries of a decision for the same row: exactly one succeeds.
    #[test]
    fn prop_row_resolves_once(chain in arb_chain(), first_deny in any::<bool>(), second_deny in any::<bool>()) {
        let mut chain = chain;
        let row = ApprovalMachine::actionable(&chain)[0].clone();
        let decide = |deny: bool| if deny { Decision::Deny } else { Decision::Approve };
        let requester = UserId::new();

        let first = ApprovalMachine::resolve(
            &mut chain, row.id, row.approver_id, requester, decide(first_deny), None, Utc::now(),
        );
        let second = ApprovalMachine::resolve(
            &mut chain, row.id, row.approver_id, requester, decide(second_deny), None, Utc::now(),
        );
        prop_assert!(first.is_ok());
        prop_assert!(matches!(second, Err(WorkflowError::AlreadyResolved(_))));
    }
}
