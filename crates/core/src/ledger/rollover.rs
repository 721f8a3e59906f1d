//! Year-end rollover and forfeiture.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::ledger::balance::{BalanceLedger, Component};
use crate::ledger::error::LedgerError;
use crate::ledger::types::{LedgerTransaction, RolloverOutcome, RolloverPlan, TransactionType};
use crate::policy::{LeaveType, Policy};

/// Stateless year-end calculations.
pub struct RolloverService;

impl RolloverService {
    /// Splits a closing balance into carried and forfeited days.
    ///
    /// Days held by undecided requests are settled on the closing row, so
    /// only `closing_balance - held` is split. A negative remainder is
    /// carried in full. A positive one carries up to the cap when both the
    /// type and the policy allow it; the rest is forfeited.
    #[must_use]
    pub fn plan(
        closing_balance: Decimal,
        held: Decimal,
        leave_type: &LeaveType,
        policy: Option<&Policy>,
    ) -> RolloverPlan {
        let open = closing_balance - held;
        if open < Decimal::ZERO {
            return RolloverPlan {
                closing_balance,
                held,
                carry: open,
                forfeit: Decimal::ZERO,
            };
        }

        let carry = match policy {
            Some(p) if leave_type.carryover_allowed && p.rollover_enabled => {
                p.max_rollover_days.map_or(open, |cap| open.min(cap))
            }
            _ => Decimal::ZERO,
        };
        RolloverPlan {
            closing_balance,
            held,
            carry,
            forfeit: open - carry,
        }
    }

    /// Closes the row's year: writes the forfeiture and marks it rolled over.
    ///
    /// Held reservations survive the close. A later commit consumes them
    /// from the closing row and a later release forfeits them, so the
    /// carried amount never changes after the fact.
    ///
    /// Returns `AlreadyProcessed` without touching the row on a re-run.
    ///
    /// # Errors
    ///
    /// Returns `DateOutOfRange` if the year end cannot be represented.
    pub fn close_year(
        closing: &mut BalanceLedger,
        leave_type: &LeaveType,
        policy: Option<&Policy>,
        now: DateTime<Utc>,
    ) -> Result<RolloverOutcome, LedgerError> {
        let key = closing.key();
        if let Some(rolled_over_on) = closing.balance.rolled_over_on {
            return Ok(RolloverOutcome::AlreadyProcessed {
                key,
                rolled_over_on,
            });
        }

        let year_end = key
            .year_end()
            .ok_or_else(|| LedgerError::DateOutOfRange(format!("year end of {}", key.year)))?;
        let plan = Self::plan(
            closing.balance.balance,
            closing.balance.pending_balance,
            leave_type,
            policy,
        );

        if plan.forfeit > Decimal::ZERO {
            closing.post(
                TransactionType::Forfeiture,
                Component::Forfeited,
                -plan.forfeit,
                year_end,
                None,
                format!("year-end forfeiture {}", key.year),
                now,
            );
        }
        closing.balance.rolled_over_on = Some(year_end);
        closing.balance.updated_at = now;

        Ok(RolloverOutcome::Processed { key, plan })
    }

    /// Writes the carried days onto the next year's row.
    ///
    /// # Errors
    ///
    /// Returns `DateOutOfRange` if the year start cannot be represented.
    pub fn carry_forward(
        next: &mut BalanceLedger,
        plan: &RolloverPlan,
        now: DateTime<Utc>,
    ) -> Result<Option<LedgerTransaction>, LedgerError> {
        if plan.carry.is_zero() {
            return Ok(None);
        }
        let key = next.key();
        let year_start = key
            .year_start()
            .ok_or_else(|| LedgerError::DateOutOfRange(format!("year start of {}", key.year)))?;
        Ok(Some(next.post(
            TransactionType::Rollover,
            Component::Rollover,
            plan.carry,
            year_start,
            None,
            format!("carried over from {}", key.year - 1),
            now,
        )))
    }
}
