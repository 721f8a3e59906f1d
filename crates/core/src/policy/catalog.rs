//! Policy catalog rules.
//!
//! Policies are effective dated and never deleted: assigning a new policy
//! end-dates the one it replaces. Lookups always name the date they resolve
//! for.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use accrue_shared::types::{LeaveTypeId, PolicyId, UserId};

use crate::policy::error::PolicyError;
use crate::policy::types::{
    AssignPolicyInput, CreateLeaveTypeInput, LeaveType, Policy, UpdateLeaveTypeInput,
};

/// Maximum length of a leave type code.
pub const MAX_CODE_LENGTH: usize = 32;

/// Stateless service over leave type and policy collections.
pub struct PolicyCatalog;

impl PolicyCatalog {
    /// Validates a new leave type against the existing catalog.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLeaveType` for an empty code or name and
    /// `DuplicateCode` when the code (case-insensitive) is taken.
    pub fn validate_leave_type(
        input: &CreateLeaveTypeInput,
        existing: &[LeaveType],
    ) -> Result<(), PolicyError> {
        let code = input.code.trim();
        if code.is_empty() {
            return Err(PolicyError::InvalidLeaveType("code is required".to_string()));
        }
        if code.len() > MAX_CODE_LENGTH {
            return Err(PolicyError::InvalidLeaveType(format!(
                "code must be at most {MAX_CODE_LENGTH} characters"
            )));
        }
        if input.name.trim().is_empty() {
            return Err(PolicyError::InvalidLeaveType("name is required".to_string()));
        }
        if existing.iter().any(|t| t.code.eq_ignore_ascii_case(code)) {
            return Err(PolicyError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }

    /// Builds an active leave type from validated input.
    #[must_use]
    pub fn build_leave_type(input: CreateLeaveTypeInput, now: DateTime<Utc>) -> LeaveType {
        LeaveType {
            id: LeaveTypeId::new(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            flags: input.flags,
            uses_balance: input.uses_balance,
            negative_allowed: input.negative_allowed,
            carryover_allowed: input.carryover_allowed,
            is_active: true,
            created_at: now,
        }
    }

    /// Applies the mutable fields of `input`; code and balance rules stay fixed.
    pub fn apply_update(leave_type: &mut LeaveType, input: UpdateLeaveTypeInput) {
        if let Some(flags) = input.flags {
            leave_type.flags = flags;
        }
        if let Some(is_active) = input.is_active {
            leave_type.is_active = is_active;
        }
    }

    /// Validates policy amounts and dates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPolicy` for negative amounts or an end date before the
    /// effective date.
    pub fn validate_policy(input: &AssignPolicyInput) -> Result<(), PolicyError> {
        let non_negative = [
            ("initial_days", input.initial_days),
            ("annual_accrual_amount", input.annual_accrual_amount),
            ("bonus_days_per_year", input.bonus_days_per_year),
            ("max_negative_balance", input.max_negative_balance),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(PolicyError::InvalidPolicy(format!("{field} must not be negative")));
            }
        }
        if input.max_rollover_days.is_some_and(|cap| cap < Decimal::ZERO) {
            return Err(PolicyError::InvalidPolicy(
                "max_rollover_days must not be negative".to_string(),
            ));
        }
        if input.end_date.is_some_and(|end| end < input.effective_date) {
            return Err(PolicyError::InvalidPolicy(
                "end_date must not be before effective_date".to_string(),
            ));
        }
        Ok(())
    }

    /// Finds the policy that a new assignment supersedes.
    ///
    /// Returns the id of the covering policy together with its new end date
    /// (the day before the replacement takes effect).
    ///
    /// # Errors
    ///
    /// Returns `OverlappingPolicy` when an existing policy for the same user
    /// and type starts on or after the new effective date.
    pub fn supersede(
        existing: &[Policy],
        input: &AssignPolicyInput,
    ) -> Result<Option<(PolicyId, NaiveDate)>, PolicyError> {
        let same_key = existing
            .iter()
            .filter(|p| p.user_id == input.user_id && p.leave_type_id == input.leave_type_id);

        let mut superseded = None;
        for policy in same_key {
            if policy.effective_date >= input.effective_date {
                return Err(PolicyError::OverlappingPolicy {
                    effective_date: input.effective_date,
                    existing_start: policy.effective_date,
                });
            }
            if policy.is_effective_on(input.effective_date) {
                let end = input
                    .effective_date
                    .checked_sub_days(Days::new(1))
                    .ok_or_else(|| PolicyError::InvalidPolicy("effective_date out of range".into()))?;
                superseded = Some((policy.id, end));
            }
        }
        Ok(superseded)
    }

    /// Builds a policy from validated input.
    #[must_use]
    pub fn build_policy(input: AssignPolicyInput, now: DateTime<Utc>) -> Policy {
        Policy {
            id: PolicyId::new(),
            user_id: input.user_id,
            leave_type_id: input.leave_type_id,
            initial_days: input.initial_days,
            annual_accrual_amount: input.annual_accrual_amount,
            bonus_days_per_year: input.bonus_days_per_year,
            years_for_bonus: input.years_for_bonus,
            accrual_frequency: input.accrual_frequency,
            rollover_enabled: input.rollover_enabled,
            max_rollover_days: input.max_rollover_days,
            max_negative_balance: input.max_negative_balance,
            prorate_first_year: input.prorate_first_year,
            effective_date: input.effective_date,
            end_date: input.end_date,
            created_at: now,
        }
    }

    /// Resolves the policy effective for a user and type on a date.
    ///
    /// # Errors
    ///
    /// Returns `PolicyNotFound` when no policy covers the date.
    pub fn policy_as_of(
        policies: &[Policy],
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        date: NaiveDate,
    ) -> Result<&Policy, PolicyError> {
        policies
            .iter()
            .find(|p| {
                p.user_id == user_id && p.leave_type_id == leave_type_id && p.is_effective_on(date)
            })
            .ok_or(PolicyError::PolicyNotFound {
                user_id,
                leave_type_id,
                date,
            })
    }

    /// Returns every policy effective on a date.
    #[must_use]
    pub fn active_as_of(policies: &[Policy], date: NaiveDate) -> Vec<&Policy> {
        policies.iter().filter(|p| p.is_effective_on(date)).collect()
    }
}
