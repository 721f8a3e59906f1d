//! Policy catalog error types.

use chrono::NaiveDate;
use thiserror::Error;

use accrue_shared::types::{LeaveTypeId, UserId};

/// Errors that can occur while managing leave types and policies.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No policy is effective for the user and type on the date.
    #[error("No policy for user {user_id} and leave type {leave_type_id} on {date}")]
    PolicyNotFound {
        /// The employee.
        user_id: UserId,
        /// The leave type.
        leave_type_id: LeaveTypeId,
        /// The lookup date.
        date: NaiveDate,
    },

    /// Leave type not found.
    #[error("Leave type {0} not found")]
    LeaveTypeNotFound(LeaveTypeId),

    /// Leave type is inactive and accepts no new requests.
    #[error("Leave type {0} is inactive")]
    LeaveTypeInactive(LeaveTypeId),

    /// Another leave type already uses the code.
    #[error("Leave type code '{0}' already exists")]
    DuplicateCode(String),

    /// Leave type input failed validation.
    #[error("Invalid leave type: {0}")]
    InvalidLeaveType(String),

    /// Policy input failed validation.
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    /// The new policy cannot supersede an existing one.
    #[error("Policy effective {effective_date} overlaps an existing policy starting {existing_start}")]
    OverlappingPolicy {
        /// Effective date of the rejected policy.
        effective_date: NaiveDate,
        /// Start date of the policy it collides with.
        existing_start: NaiveDate,
    },
}

impl PolicyError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::PolicyNotFound { .. } | Self::LeaveTypeNotFound(_) => 404,
            Self::LeaveTypeInactive(_) => 422,
            Self::DuplicateCode(_) | Self::OverlappingPolicy { .. } => 409,
            Self::InvalidLeaveType(_) | Self::InvalidPolicy(_) => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::PolicyNotFound { .. } => "POLICY_NOT_FOUND",
            Self::LeaveTypeNotFound(_) => "LEAVE_TYPE_NOT_FOUND",
            Self::LeaveTypeInactive(_) => "LEAVE_TYPE_INACTIVE",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::InvalidLeaveType(_) => "INVALID_LEAVE_TYPE",
            Self::InvalidPolicy(_) => "INVALID_POLICY",
            Self::OverlappingPolicy { .. } => "OVERLAPPING_POLICY",
        }
    }
}
