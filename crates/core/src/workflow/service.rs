//! Request status transitions.
//!
//! This module implements the request-level state machine; approval rows
//! are handled by `ApprovalMachine`.

use accrue_shared::types::UserId;

use crate::request::RequestStatus;
use crate::workflow::error::WorkflowError;

/// Stateless service for request status transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Approve a pending request.
    ///
    /// # Errors
    /// * `WorkflowError::InvalidTransition` if not in Pending status
    pub fn approve(current_status: RequestStatus) -> Result<RequestStatus, WorkflowError> {
        Self::transition(current_status, RequestStatus::Approved)
    }

    /// Deny a pending request.
    ///
    /// # Errors
    /// * `WorkflowError::InvalidTransition` if not in Pending status
    pub fn deny(current_status: RequestStatus) -> Result<RequestStatus, WorkflowError> {
        Self::transition(current_status, RequestStatus::Denied)
    }

    /// Withdraw a pending request.
    ///
    /// # Errors
    /// * `WorkflowError::NotRequester` if `actor` did not submit the request
    /// * `WorkflowError::InvalidTransition` if not in Pending status
    pub fn withdraw(
        current_status: RequestStatus,
        requester: UserId,
        actor: UserId,
    ) -> Result<RequestStatus, WorkflowError> {
        if actor != requester {
            return Err(WorkflowError::NotRequester { user_id: actor });
        }
        Self::transition(current_status, RequestStatus::Withdrawn)
    }

    /// Cancel a pending request.
    ///
    /// # Errors
    /// * `WorkflowError::CancellationReasonRequired` if reason is empty
    /// * `WorkflowError::InvalidTransition` if not in Pending status
    pub fn cancel(
        current_status: RequestStatus,
        reason: &str,
    ) -> Result<RequestStatus, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::CancellationReasonRequired);
        }
        Self::transition(current_status, RequestStatus::Cancelled)
    }

    /// Check if a status transition is valid.
    ///
    /// Only `Pending` has outgoing transitions; every other status is final.
    #[must_use]
    pub fn is_valid_transition(from: RequestStatus, to: RequestStatus) -> bool {
        matches!(
            (from, to),
            (
                RequestStatus::Pending,
                RequestStatus::Approved
                    | RequestStatus::Denied
                    | RequestStatus::Cancelled
                    | RequestStatus::Withdrawn
            )
        )
    }

    fn transition(from: RequestStatus, to: RequestStatus) -> Result<RequestStatus, WorkflowError> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(WorkflowError::InvalidTransition { from, to })
        }
    }
}
