//! Period accrual and service-year bonus.
//!
//! Periods are calendar aligned. A period is materialized when its boundary
//! `b` satisfies `last_accrual_date < b <= as_of`; the boundary on January 1st
//! of the following year still belongs to the closing row.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::ledger::balance::{BalanceLedger, Component};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{AccrualOutcome, TransactionType};
use crate::policy::Policy;

/// Stateless accrual calculations.
pub struct AccrualEngine;

impl AccrualEngine {
    /// Materializes every period of `policy` due on the row up to `as_of`.
    ///
    /// Re-running with the same `as_of` writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `DateOutOfRange` if calendar arithmetic overflows.
    pub fn accrue(
        ledger: &mut BalanceLedger,
        policy: &Policy,
        hire_date: Option<NaiveDate>,
        as_of: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AccrualOutcome, LedgerError> {
        let key = ledger.key();
        let mut outcome = AccrualOutcome {
            key,
            periods: 0,
            accrued: Decimal::ZERO,
            bonus: Decimal::ZERO,
            accrued_through: ledger.balance.last_accrual_date,
        };

        let year_start = key.year_start().ok_or_else(|| out_of_range(key.year))?;
        let next_year_start = key
            .next_year()
            .year_start()
            .ok_or_else(|| out_of_range(key.year + 1))?;

        let mut limit = as_of.min(next_year_start);
        if let Some(end) = policy.end_date {
            let after_end = end
                .checked_add_days(Days::new(1))
                .ok_or_else(|| out_of_range(key.year))?;
            limit = limit.min(after_end);
        }

        let frequency = policy.accrual_frequency;
        let per_period = policy.accrual_per_period();
        let mut cursor = ledger
            .balance
            .last_accrual_date
            .unwrap_or_else(|| year_start.max(policy.effective_date));

        loop {
            let boundary = frequency
                .next_boundary_after(cursor)
                .ok_or_else(|| out_of_range(key.year))?;
            if boundary > limit {
                break;
            }
            let period_start = frequency
                .period_start(cursor)
                .ok_or_else(|| out_of_range(key.year))?;

            let partial = cursor != period_start && cursor == policy.effective_date;
            let amount = if partial && policy.prorate_first_year {
                Self::prorate(per_period, period_start, cursor, boundary)
            } else {
                per_period
            };

            if amount > Decimal::ZERO {
                ledger.post(
                    TransactionType::Accrual,
                    Component::Accrued,
                    amount,
                    boundary,
                    None,
                    format!("{frequency} accrual through {boundary}"),
                    now,
                );
                outcome.accrued += amount;
            }

            if let Some(bonus) = Self::bonus_due(ledger, policy, hire_date, boundary) {
                ledger.post(
                    TransactionType::Bonus,
                    Component::Bonus,
                    bonus,
                    boundary,
                    None,
                    format!("service bonus ({} years)", policy.years_for_bonus),
                    now,
                );
                ledger.balance.bonus_granted_on = Some(boundary);
                outcome.bonus += bonus;
            }

            ledger.balance.last_accrual_date = Some(boundary);
            ledger.balance.updated_at = now;
            outcome.periods += 1;
            outcome.accrued_through = Some(boundary);
            cursor = boundary;
        }

        Ok(outcome)
    }

    /// Scales a full period amount by the share of the period left after `from`.
    #[must_use]
    pub fn prorate(
        per_period: Decimal,
        period_start: NaiveDate,
        from: NaiveDate,
        boundary: NaiveDate,
    ) -> Decimal {
        let full = (boundary - period_start).num_days();
        let elapsed = (boundary - from).num_days();
        if full <= 0 || elapsed <= 0 {
            return Decimal::ZERO;
        }
        (per_period * Decimal::from(elapsed) / Decimal::from(full)).round_dp(4)
    }

    /// Completed service years on `on` for an employee hired on `hire_date`.
    #[must_use]
    pub fn completed_years(hire_date: NaiveDate, on: NaiveDate) -> u32 {
        on.years_since(hire_date).unwrap_or(0)
    }

    fn bonus_due(
        ledger: &BalanceLedger,
        policy: &Policy,
        hire_date: Option<NaiveDate>,
        boundary: NaiveDate,
    ) -> Option<Decimal> {
        if policy.bonus_days_per_year <= Decimal::ZERO || ledger.balance.bonus_granted_on.is_some() {
            return None;
        }
        let hire_date = hire_date?;
        (Self::completed_years(hire_date, boundary) >= policy.years_for_bonus)
            .then_some(policy.bonus_days_per_year)
    }
}

fn out_of_range(year: i32) -> LedgerError {
    LedgerError::DateOutOfRange(format!("accrual calendar for year {year}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::BalanceKey;
    use crate::policy::{AccrualFrequency, Policy};
    use accrue_shared::types::{LeaveTypeId, PolicyId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn policy(annual: Decimal, frequency: AccrualFrequency, effective: NaiveDate) -> Policy {
        Policy {
            id: PolicyId::new(),
            user_id: UserId::new(),
            leave_type_id: LeaveTypeId::new(),
            initial_days: Decimal::ZERO,
            annual_accrual_amount: annual,
            bonus_days_per_year: Decimal::ZERO,
            years_for_bonus: 0,
            accrual_frequency: frequency,
            rollover_enabled: false,
            max_rollover_days: None,
            max_negative_balance: Decimal::ZERO,
            prorate_first_year: false,
            effective_date: effective,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    fn open(policy: &Policy, year: i32) -> BalanceLedger {
        let key = BalanceKey::new(policy.user_id, policy.leave_type_id, year);
        let anchor = date(year, 1, 1).max(policy.effective_date);
        BalanceLedger::open(key, anchor, policy.initial_days, Utc::now()).unwrap()
    }

    #[test]
    fn test_monthly_accrual_three_periods() {
        let policy = policy(dec!(12), AccrualFrequency::Monthly, date(2026, 1, 1));
        let mut ledger = open(&policy, 2026);

        let outcome =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 4, 1), Utc::now()).unwrap();

        assert_eq!(outcome.periods, 3);
        assert_eq!(outcome.accrued, dec!(3));
        assert_eq!(ledger.balance().balance, dec!(3));
        assert_eq!(ledger.balance().last_accrual_date, Some(date(2026, 4, 1)));
        assert_eq!(ledger.transactions().len(), 3);
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_accrual_is_idempotent() {
        let policy = policy(dec!(12), AccrualFrequency::Monthly, date(2026, 1, 1));
        let mut ledger = open(&policy, 2026);

        AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 4, 15), Utc::now()).unwrap();
        let again =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 4, 15), Utc::now()).unwrap();

        assert!(again.is_noop());
        assert_eq!(ledger.balance().balance, dec!(3));
    }

    #[test]
    fn test_boundary_not_reached_accrues_nothing() {
        let policy = policy(dec!(12), AccrualFrequency::Quarterly, date(2026, 1, 1));
        let mut ledger = open(&policy, 2026);
        let outcome =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 3, 31), Utc::now()).unwrap();
        assert!(outcome.is_noop());
    }

    #[test]
    fn test_year_end_boundary_belongs_to_closing_row() {
        let policy = policy(dec!(4), AccrualFrequency::Annually, date(2025, 1, 1));
        let mut ledger = open(&policy, 2026);
        let outcome =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2027, 3, 1), Utc::now()).unwrap();
        assert_eq!(outcome.periods, 1);
        assert_eq!(outcome.accrued_through, Some(date(2027, 1, 1)));
        assert_eq!(ledger.balance().balance, dec!(4));
    }

    #[test]
    fn test_first_period_prorated() {
        let mut policy = policy(dec!(12), AccrualFrequency::Monthly, date(2026, 4, 16));
        policy.prorate_first_year = true;
        let mut ledger = open(&policy, 2026);

        let outcome =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 6, 1), Utc::now()).unwrap();

        // April has 30 days, 15 of them from the 16th on.
        assert_eq!(outcome.periods, 2);
        assert_eq!(outcome.accrued, dec!(1.5));
    }

    #[test]
    fn test_first_period_full_without_proration() {
        let policy = policy(dec!(12), AccrualFrequency::Monthly, date(2026, 4, 16));
        let mut ledger = open(&policy, 2026);
        let outcome =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 6, 1), Utc::now()).unwrap();
        assert_eq!(outcome.accrued, dec!(2));
    }

    #[test]
    fn test_policy_end_date_stops_accrual() {
        let mut policy = policy(dec!(12), AccrualFrequency::Monthly, date(2026, 1, 1));
        policy.end_date = Some(date(2026, 2, 28));
        let mut ledger = open(&policy, 2026);
        let outcome =
            AccrualEngine::accrue(&mut ledger, &policy, None, date(2026, 12, 1), Utc::now()).unwrap();
        assert_eq!(outcome.periods, 2);
    }

    #[test]
    fn test_bonus_granted_once_after_threshold() {
        let mut policy = policy(dec!(12), AccrualFrequency::Monthly, date(2026, 1, 1));
        policy.bonus_days_per_year = dec!(2);
        policy.years_for_bonus = 5;
        let hire = date(2021, 3, 10);
        let mut ledger = open(&policy, 2026);

        let early =
            AccrualEngine::accrue(&mut ledger, &policy, Some(hire), date(2026, 3, 1), Utc::now())
                .unwrap();
        assert_eq!(early.bonus, Decimal::ZERO);

        let later =
            AccrualEngine::accrue(&mut ledger, &policy, Some(hire), date(2026, 8, 1), Utc::now())
                .unwrap();
        assert_eq!(later.bonus, dec!(2));
        assert_eq!(ledger.balance().bonus_granted_on, Some(date(2026, 4, 1)));
        assert_eq!(ledger.balance().bonus_balance, dec!(2));
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_completed_years() {
        assert_eq!(AccrualEngine::completed_years(date(2020, 6, 15), date(2026, 6, 14)), 5);
        assert_eq!(AccrualEngine::completed_years(date(2020, 6, 15), date(2026, 6, 15)), 6);
        assert_eq!(AccrualEngine::completed_years(date(2027, 1, 1), date(2026, 6, 15)), 0);
    }
}
