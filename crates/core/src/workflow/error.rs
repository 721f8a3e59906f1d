//! Workflow error types for the request approval lifecycle.

use thiserror::Error;

use accrue_shared::types::{ApprovalId, UserId};

use crate::directory::DirectoryError;
use crate::request::RequestStatus;

/// Errors that can occur during approval workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Attempted an invalid request status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: RequestStatus,
        /// The attempted target status.
        to: RequestStatus,
    },

    /// No valid approval chain could be built.
    #[error("Invalid approval chain: {0}")]
    InvalidChain(String),

    /// The row is not the one that may act now.
    #[error("Approval {0} is not actionable yet")]
    NotYourTurn(ApprovalId),

    /// The actor is not the row's approver.
    #[error("User {user_id} is not authorized to act on this approval")]
    NotAuthorizedToApprove {
        /// The user who attempted to act.
        user_id: UserId,
    },

    /// The row already left `pending`.
    #[error("Approval {0} is already resolved")]
    AlreadyResolved(ApprovalId),

    /// Approval row not found.
    #[error("Approval {0} not found")]
    ApprovalNotFound(ApprovalId),

    /// Delegation target or depth is not allowed.
    #[error("Invalid delegation: {0}")]
    InvalidDelegation(String),

    /// Cancellation reason is required but not provided.
    #[error("Cancellation reason is required")]
    CancellationReasonRequired,

    /// Only the requester may do this.
    #[error("User {user_id} is not the requester")]
    NotRequester {
        /// The user who attempted the action.
        user_id: UserId,
    },

    /// The org directory failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidDelegation(_) | Self::CancellationReasonRequired => 400,

            Self::NotAuthorizedToApprove { .. } | Self::NotRequester { .. } => 403,

            Self::ApprovalNotFound(_) => 404,

            Self::InvalidTransition { .. } | Self::NotYourTurn(_) | Self::AlreadyResolved(_) => {
                409
            }

            Self::InvalidChain(_) => 422,

            Self::Directory(err) => err.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidChain(_) => "INVALID_CHAIN",
            Self::NotYourTurn(_) => "NOT_YOUR_TURN",
            Self::NotAuthorizedToApprove { .. } => "NOT_AUTHORIZED_TO_APPROVE",
            Self::AlreadyResolved(_) => "ALREADY_RESOLVED",
            Self::ApprovalNotFound(_) => "APPROVAL_NOT_FOUND",
            Self::InvalidDelegation(_) => "INVALID_DELEGATION",
            Self::CancellationReasonRequired => "CANCELLATION_REASON_REQUIRED",
            Self::NotRequester { .. } => "NOT_REQUESTER",
            Self::Directory(err) => err.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_error() {
        let err = WorkflowError::InvalidTransition {
            from: RequestStatus::Approved,
            to: RequestStatus::Withdrawn,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "INVALID_TRANSITION");
        assert!(err.to_string().contains("approved"));
        assert!(err.to_string().contains("withdrawn"));
    }

    #[test]
    fn test_already_resolved_error() {
        let err = WorkflowError::AlreadyResolved(ApprovalId::new());
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "ALREADY_RESOLVED");
    }

    #[test]
    fn test_not_authorized_error() {
        let err = WorkflowError::NotAuthorizedToApprove {
            user_id: UserId::new(),
        };
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "NOT_AUTHORIZED_TO_APPROVE");
    }

    #[test]
    fn test_invalid_chain_error() {
        let err = WorkflowError::InvalidChain("no supervisors".to_string());
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "INVALID_CHAIN");
    }

    #[test]
    fn test_directory_error_passes_through() {
        let err = WorkflowError::from(DirectoryError::Unavailable("timeout".to_string()));
        assert_eq!(err.status_code(), 503);
        assert_eq!(err.error_code(), "DIRECTORY_UNAVAILABLE");
    }
}
