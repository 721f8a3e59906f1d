//! Property-based tests for WorkflowService.

use proptest::prelude::*;

use crate::request::RequestStatus;
use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;

/// Strategy for generating random RequestStatus values.
fn arb_status() -> impl Strategy<Value = RequestStatus> {
    prop_oneof![
        Just(RequestStatus::Pending),
        Just(RequestStatus::Approved),
        Just(RequestStatus::Denied),
        Just(RequestStatus::Cancelled),
        Just(RequestStatus::Withdrawn),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Valid transitions are exactly the exits from Pending.
    #[test]
    fn prop_only_pending_has_exits(from in arb_status(), to in arb_status()) {
        let valid = WorkflowService::is_valid_transition(from, to);
        prop_assert_eq!(valid, from == RequestStatus::Pending && to != RequestStatus::Pending);
    }

    /// Terminal statuses reject every operation.
    #[test]
    fn prop_terminal_rejects_all(from in arb_status()) {
        prop_assume!(from.is_terminal());
        let is_invalid = |r: Result<RequestStatus, WorkflowError>| {
            matches!(r, Err(WorkflowError::InvalidTransition { .. }))
        };
        prop_assert!(is_invalid(WorkflowService::approve(from)));
        prop_assert!(is_invalid(WorkflowService::deny(from)));
        prop_assert!(is_invalid(WorkflowService::cancel(from, "reason")));
    }
}
