//! Read-only org hierarchy oracle.
//!
//! Hierarchy data is owned elsewhere; this crate only consumes it through
//! `OrgDirectory`. Walks over the supervisor graph are bounded and reject
//! cycles.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accrue_shared::types::{DepartmentId, LeaveTypeId, PositionId, UserId};

/// Maximum number of supervisors above one employee.
pub const MAX_HIERARCHY_DEPTH: usize = 16;

/// Org attributes of one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// The employee.
    pub user_id: UserId,
    /// Department membership.
    pub department_id: Option<DepartmentId>,
    /// Position held.
    pub position_id: Option<PositionId>,
    /// Hire date for service-year bonuses.
    pub hire_date: Option<NaiveDate>,
}

impl EmployeeProfile {
    /// A profile with no org attributes.
    #[must_use]
    pub const fn bare(user_id: UserId) -> Self {
        Self {
            user_id,
            department_id: None,
            position_id: None,
            hire_date: None,
        }
    }
}

/// Errors returned by the org directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory does not know the user.
    #[error("User {0} not found in directory")]
    UserNotFound(UserId),

    /// The supervisor graph loops back on itself.
    #[error("Supervisor cycle detected at {0}")]
    CycleDetected(UserId),

    /// The supervisor chain is deeper than allowed.
    #[error("Supervisor chain deeper than {0} levels")]
    DepthExceeded(usize),

    /// The directory could not be reached.
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UserNotFound(_) => 404,
            Self::CycleDetected(_) | Self::DepthExceeded(_) => 422,
            Self::Unavailable(_) => 503,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::CycleDetected(_) => "HIERARCHY_CYCLE",
            Self::DepthExceeded(_) => "HIERARCHY_TOO_DEEP",
            Self::Unavailable(_) => "DIRECTORY_UNAVAILABLE",
        }
    }
}

/// Read-only view of the org hierarchy.
pub trait OrgDirectory: Send + Sync {
    /// Direct supervisor of `user_id` on `as_of`, if any.
    fn supervisor_of(&self, user_id: UserId, as_of: NaiveDate)
    -> Result<Option<UserId>, DirectoryError>;

    /// Org attributes of `user_id`.
    fn profile(&self, user_id: UserId) -> Result<EmployeeProfile, DirectoryError>;

    /// Longest request, in days, `approver_id` may approve alone for the type.
    ///
    /// `None` means the approver has no ceiling configured and never covers
    /// a request on their own.
    fn approval_limit(
        &self,
        approver_id: UserId,
        leave_type_id: LeaveTypeId,
    ) -> Result<Option<Decimal>, DirectoryError>;

    /// Supervisors of `user_id` from the direct one upward.
    ///
    /// # Errors
    ///
    /// Returns `CycleDetected` when a supervisor repeats (or is the user),
    /// and `DepthExceeded` past `MAX_HIERARCHY_DEPTH` levels.
    fn supervisor_chain(
        &self,
        user_id: UserId,
        as_of: NaiveDate,
    ) -> Result<Vec<UserId>, DirectoryError> {
        let mut chain: Vec<UserId> = Vec::new();
        let mut current = user_id;
        while let Some(supervisor) = self.supervisor_of(current, as_of)? {
            if supervisor == user_id || chain.contains(&supervisor) {
                return Err(DirectoryError::CycleDetected(supervisor));
            }
            if chain.len() == MAX_HIERARCHY_DEPTH {
                return Err(DirectoryError::DepthExceeded(MAX_HIERARCHY_DEPTH));
            }
            chain.push(supervisor);
            current = supervisor;
        }
        Ok(chain)
    }
}
