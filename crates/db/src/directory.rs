//! Org directory backed by the static chart in configuration.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use accrue_core::directory::{DirectoryError, EmployeeProfile, OrgDirectory};
use accrue_shared::config::DirectoryEntry;
use accrue_shared::types::{LeaveTypeId, UserId};

/// Read-only org chart loaded once at startup.
///
/// Every user that appears as a supervisor must have an entry of their own;
/// the chart does not change over time, so `as_of` is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticOrgDirectory {
    entries: HashMap<UserId, DirectoryEntry>,
}

impl StaticOrgDirectory {
    /// Builds the directory from configured entries. Later duplicates win.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = DirectoryEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.user_id, e)).collect(),
        }
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, user_id: UserId) -> Result<&DirectoryEntry, DirectoryError> {
        self.entries
            .get(&user_id)
            .ok_or(DirectoryError::UserNotFound(user_id))
    }
}

impl OrgDirectory for StaticOrgDirectory {
    fn supervisor_of(
        &self,
        user_id: UserId,
        _as_of: NaiveDate,
    ) -> Result<Option<UserId>, DirectoryError> {
        Ok(self.entry(user_id)?.supervisor_id)
    }

    fn profile(&self, user_id: UserId) -> Result<EmployeeProfile, DirectoryError> {
        let entry = self.entry(user_id)?;
        Ok(EmployeeProfile {
            user_id,
            department_id: entry.department_id,
            position_id: entry.position_id,
            hire_date: entry.hire_date,
        })
    }

    fn approval_limit(
        &self,
        approver_id: UserId,
        leave_type_id: LeaveTypeId,
    ) -> Result<Option<Decimal>, DirectoryError> {
        let entry = self.entry(approver_id)?;
        Ok(entry
            .approval_limits
            .iter()
            .find(|limit| limit.leave_type_id == leave_type_id)
            .map(|limit| limit.max_days)
            .or(entry.default_approval_limit))
    }
}
