//! Ledger rules that sit between the policy catalog and a balance row.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::ledger::balance::BalanceLedger;
use crate::ledger::error::LedgerError;
use crate::ledger::types::BalanceKey;
use crate::policy::{LeaveType, Policy};

/// Stateless helpers for opening rows and sizing holds.
pub struct LedgerService;

impl LedgerService {
    /// Lowest value `balance - pending` may reach for the type and policy.
    #[must_use]
    pub fn balance_floor(leave_type: &LeaveType, policy: &Policy) -> Decimal {
        if leave_type.negative_allowed {
            -policy.max_negative_balance
        } else {
            Decimal::ZERO
        }
    }

    /// Balance year charged for a request starting on `start_date`.
    #[must_use]
    pub fn balance_year(start_date: NaiveDate) -> i32 {
        start_date.year()
    }

    /// Anchor date of a new row: the later of January 1st and the policy start.
    ///
    /// # Errors
    ///
    /// Returns `DateOutOfRange` if the year cannot be represented.
    pub fn anchor_date(policy: &Policy, year: i32) -> Result<NaiveDate, LedgerError> {
        let year_start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| LedgerError::DateOutOfRange(format!("year {year}")))?;
        Ok(year_start.max(policy.effective_date))
    }

    /// Opens a row for `key`, seeded from `policy` when one applies.
    ///
    /// # Errors
    ///
    /// Returns `BalanceNotTracked` for types without balances.
    pub fn open_row(
        key: BalanceKey,
        leave_type: &LeaveType,
        policy: Option<&Policy>,
        now: DateTime<Utc>,
    ) -> Result<BalanceLedger, LedgerError> {
        if !leave_type.uses_balance {
            return Err(LedgerError::BalanceNotTracked(leave_type.id));
        }
        match policy {
            Some(policy) => {
                let anchor = Self::anchor_date(policy, key.year)?;
                BalanceLedger::open(key, anchor, policy.initial_days, now)
            }
            None => {
                let anchor = key
                    .year_start()
                    .ok_or_else(|| LedgerError::DateOutOfRange(format!("year {}", key.year)))?;
                BalanceLedger::open(key, anchor, Decimal::ZERO, now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AccrualFrequency, ApprovalFlags};
    use accrue_shared::types::{LeaveTypeId, PolicyId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn leave_type(uses_balance: bool, negative_allowed: bool) -> LeaveType {
        LeaveType {
            id: LeaveTypeId::new(),
            code: "VAC".to_string(),
            name: "Vacation".to_string(),
            flags: ApprovalFlags::default(),
            uses_balance,
            negative_allowed,
            carryover_allowed: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn policy(effective: NaiveDate) -> Policy {
        Policy {
            id: PolicyId::new(),
            user_id: UserId::new(),
            leave_type_id: LeaveTypeId::new(),
            initial_days: dec!(10),
            annual_accrual_amount: dec!(12),
            bonus_days_per_year: Decimal::ZERO,
            years_for_bonus: 0,
            accrual_frequency: AccrualFrequency::Monthly,
            rollover_enabled: false,
            max_rollover_days: None,
            max_negative_balance: dec!(3),
            prorate_first_year: false,
            effective_date: effective,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_balance_floor() {
        let p = policy(date(2026, 1, 1));
        assert_eq!(LedgerService::balance_floor(&leave_type(true, true), &p), dec!(-3));
        assert_eq!(LedgerService::balance_floor(&leave_type(true, false), &p), Decimal::ZERO);
    }

    #[test]
    fn test_anchor_date() {
        let mid_year = policy(date(2026, 5, 10));
        assert_eq!(LedgerService::anchor_date(&mid_year, 2026).unwrap(), date(2026, 5, 10));
        assert_eq!(LedgerService::anchor_date(&mid_year, 2027).unwrap(), date(2027, 1, 1));
    }

    #[test]
    fn test_open_row_requires_tracking() {
        let lt = leave_type(false, false);
        let key = BalanceKey::new(UserId::new(), lt.id, 2026);
        assert!(matches!(
            LedgerService::open_row(key, &lt, None, Utc::now()),
            Err(LedgerError::BalanceNotTracked(_))
        ));
    }

    #[test]
    fn test_open_row_seeds_policy_allocation() {
        let lt = leave_type(true, false);
        let p = policy(date(2026, 1, 1));
        let key = BalanceKey::new(p.user_id, lt.id, 2026);
        let ledger = LedgerService::open_row(key, &lt, Some(&p), Utc::now()).unwrap();
        assert_eq!(ledger.balance().balance, dec!(10));
        assert_eq!(ledger.balance().initial_balance, dec!(10));
    }
}
