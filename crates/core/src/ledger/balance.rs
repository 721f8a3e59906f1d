//! Balance row aggregate.
//!
//! A `BalanceLedger` owns one yearly balance row together with its
//! append-only transaction chain and the reservations held against it.
//! Every mutation updates the row and the chain in one step; callers run
//! `reconcile` on the result before publishing it.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use accrue_shared::types::{BalanceId, RequestId, ReservationId, TransactionId};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{
    Balance, BalanceKey, BalanceSnapshot, LedgerTransaction, Reservation, ReservationStatus,
    TransactionType,
};

/// Description written on the seeding entry of a new row.
pub const INITIAL_ALLOCATION: &str = "initial allocation";

/// Balance component a transaction is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Component {
    Initial,
    Accrued,
    Rollover,
    Bonus,
    Adjusted,
    Used,
    Forfeited,
}

/// Outcome of committing a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The usage entry for the reservation.
    pub transaction_id: TransactionId,
    /// False when the reservation had already been committed.
    pub newly_committed: bool,
}

/// One balance row with its transaction chain and reservations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceLedger {
    pub(crate) balance: Balance,
    pub(crate) transactions: Vec<LedgerTransaction>,
    pub(crate) reservations: BTreeMap<ReservationId, Reservation>,
}

impl BalanceLedger {
    /// Opens a row anchored at `anchor`, seeding `initial_days`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a negative initial allocation.
    pub fn open(
        key: BalanceKey,
        anchor: NaiveDate,
        initial_days: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if initial_days < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "initial allocation {initial_days} is negative"
            )));
        }

        let mut ledger = Self {
            balance: Balance {
                id: BalanceId::new(),
                key,
                balance: Decimal::ZERO,
                pending_balance: Decimal::ZERO,
                initial_balance: Decimal::ZERO,
                accrued_balance: Decimal::ZERO,
                rollover_balance: Decimal::ZERO,
                bonus_balance: Decimal::ZERO,
                adjusted_balance: Decimal::ZERO,
                used_balance: Decimal::ZERO,
                forfeited_balance: Decimal::ZERO,
                last_accrual_date: Some(anchor),
                bonus_granted_on: None,
                rolled_over_on: None,
                created_at: now,
                updated_at: now,
            },
            transactions: Vec::new(),
            reservations: BTreeMap::new(),
        };

        if initial_days > Decimal::ZERO {
            ledger.post(
                TransactionType::Adjustment,
                Component::Initial,
                initial_days,
                anchor,
                None,
                INITIAL_ALLOCATION.to_string(),
                now,
            );
        }
        Ok(ledger)
    }

    /// Returns the row key.
    #[must_use]
    pub const fn key(&self) -> BalanceKey {
        self.balance.key
    }

    /// Returns the balance row.
    #[must_use]
    pub const fn balance(&self) -> &Balance {
        &self.balance
    }

    /// Returns the transaction chain in sequence order.
    #[must_use]
    pub fn transactions(&self) -> &[LedgerTransaction] {
        &self.transactions
    }

    /// Looks up a reservation.
    #[must_use]
    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.get(&id)
    }

    /// Iterates over all reservations of the row.
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    /// Builds the read view of the row.
    #[must_use]
    pub fn snapshot(&self) -> BalanceSnapshot {
        let b = &self.balance;
        BalanceSnapshot {
            user_id: b.key.user_id,
            leave_type_id: b.key.leave_type_id,
            year: b.key.year,
            balance: b.balance,
            pending_balance: b.pending_balance,
            available: b.available(),
            initial_balance: b.initial_balance,
            accrued_balance: b.accrued_balance,
            rollover_balance: b.rollover_balance,
            bonus_balance: b.bonus_balance,
            adjusted_balance: b.adjusted_balance,
            used_balance: b.used_balance,
            forfeited_balance: b.forfeited_balance,
            last_accrual_date: b.last_accrual_date,
            rolled_over_on: b.rolled_over_on,
            transaction_count: self.transactions.len() as u64,
        }
    }

    /// Appends one entry and updates the row.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn post(
        &mut self,
        transaction_type: TransactionType,
        component: Component,
        amount: Decimal,
        effective_date: NaiveDate,
        request_id: Option<RequestId>,
        description: String,
        now: DateTime<Utc>,
    ) -> LedgerTransaction {
        let balance_before = self.balance.balance;
        let balance_after = balance_before + amount;

        match component {
            Component::Initial => self.balance.initial_balance += amount,
            Component::Accrued => self.balance.accrued_balance += amount,
            Component::Rollover => self.balance.rollover_balance += amount,
            Component::Bonus => self.balance.bonus_balance += amount,
            Component::Adjusted => self.balance.adjusted_balance += amount,
            Component::Used => self.balance.used_balance -= amount,
            Component::Forfeited => self.balance.forfeited_balance -= amount,
        }
        self.balance.balance = balance_after;
        self.balance.updated_at = now;

        let transaction = LedgerTransaction {
            id: TransactionId::new(),
            balance_id: self.balance.id,
            sequence: self.transactions.len() as u64 + 1,
            transaction_type,
            amount,
            balance_before,
            balance_after,
            request_id,
            effective_date,
            description,
            created_at: now,
        };
        self.transactions.push(transaction.clone());
        transaction
    }

    /// Holds `days` against the row.
    ///
    /// The hold succeeds only if `balance - pending - days >= floor`, where
    /// `floor` is zero or the negated negative-balance cap. No ledger entry is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive days, `YearClosed` once the
    /// row has been rolled over and `InsufficientBalance` when the hold would
    /// cross the floor.
    pub fn reserve(
        &mut self,
        days: Decimal,
        floor: Decimal,
        request_id: Option<RequestId>,
        now: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError> {
        if days <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(format!(
                "reserved days must be positive, got {days}"
            )));
        }
        if self.balance.rolled_over_on.is_some() {
            return Err(LedgerError::YearClosed(self.balance.key));
        }

        let available = self.balance.available();
        if available - days < floor {
            return Err(LedgerError::InsufficientBalance {
                requested: days,
                available,
            });
        }

        let reservation = Reservation {
            id: ReservationId::new(),
            key: self.balance.key,
            request_id,
            days,
            status: ReservationStatus::Held,
            usage_transaction_id: None,
            created_at: now,
            settled_at: None,
        };
        self.balance.pending_balance += days;
        self.balance.updated_at = now;
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    /// Converts a held reservation into a usage entry.
    ///
    /// Committing an already committed reservation returns its existing
    /// entry without writing anything.
    ///
    /// # Errors
    ///
    /// Returns `ReservationNotFound` or `InvalidTransition` (if released).
    pub fn commit(
        &mut self,
        reservation_id: ReservationId,
        effective_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome, LedgerError> {
        let reservation = self
            .reservations
            .get(&reservation_id)
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;

        match reservation.status {
            ReservationStatus::Committed => {
                let transaction_id = reservation.usage_transaction_id.ok_or_else(|| {
                    LedgerError::InvariantViolation(format!(
                        "committed reservation {reservation_id} has no usage entry"
                    ))
                })?;
                return Ok(CommitOutcome {
                    transaction_id,
                    newly_committed: false,
                });
            }
            ReservationStatus::Released => {
                return Err(LedgerError::InvalidTransition {
                    reservation_id,
                    from: ReservationStatus::Released,
                    to: ReservationStatus::Committed,
                });
            }
            ReservationStatus::Held => {}
        }

        let days = reservation.days;
        let request_id = reservation.request_id;
        self.balance.pending_balance -= days;
        let transaction = self.post(
            TransactionType::Usage,
            Component::Used,
            -days,
            effective_date,
            request_id,
            "approved leave".to_string(),
            now,
        );

        if let Some(r) = self.reservations.get_mut(&reservation_id) {
            r.status = ReservationStatus::Committed;
            r.usage_transaction_id = Some(transaction.id);
            r.settled_at = Some(now);
        }
        Ok(CommitOutcome {
            transaction_id: transaction.id,
            newly_committed: true,
        })
    }

    /// Returns a held reservation without consuming balance.
    ///
    /// On a row that has already been rolled over the freed days are
    /// forfeited instead. Returns `false` when the reservation had already been released.
    ///
    /// # Errors
    ///
    /// Returns `ReservationNotFound` or `InvalidTransition` (if committed).
    pub fn release(
        &mut self,
        reservation_id: ReservationId,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let reservation = self
            .reservations
            .get_mut(&reservation_id)
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;

        match reservation.status {
            ReservationStatus::Released => Ok(false),
            ReservationStatus::Committed => Err(LedgerError::InvalidTransition {
                reservation_id,
                from: ReservationStatus::Committed,
                to: ReservationStatus::Released,
            }),
            ReservationStatus::Held => {
                reservation.status = ReservationStatus::Released;
                reservation.settled_at = Some(now);
                let days = reservation.days;
                let request_id = reservation.request_id;
                self.balance.pending_balance -= days;
                self.balance.updated_at = now;

                // The year was split without these days; they cannot be carried now.
                if let Some(year_end) = self.balance.rolled_over_on {
                    self.post(
                        TransactionType::Forfeiture,
                        Component::Forfeited,
                        -days,
                        year_end,
                        request_id,
                        "released after year end".to_string(),
                        now,
                    );
                }
                Ok(true)
            }
        }
    }

    /// Writes a manual adjustment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for a zero amount and `ReasonRequired` for an
    /// empty reason.
    pub fn adjust(
        &mut self,
        amount: Decimal,
        reason: &str,
        effective_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<LedgerTransaction, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("adjustment must not be zero".to_string()));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired);
        }
        Ok(self.post(
            TransactionType::Adjustment,
            Component::Adjusted,
            amount,
            effective_date,
            None,
            reason.to_string(),
            now,
        ))
    }

    /// Resets the balance to `target`, writing the difference.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for an empty reason.
    pub fn reset(
        &mut self,
        target: Decimal,
        reason: &str,
        effective_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<LedgerTransaction, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::ReasonRequired);
        }
        let delta = target - self.balance.balance;
        Ok(self.post(
            TransactionType::Reset,
            Component::Adjusted,
            delta,
            effective_date,
            None,
            reason.to_string(),
            now,
        ))
    }

    /// Verifies the row against its chain and reservations.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` describing the first mismatch found.
    pub fn reconcile(&self) -> Result<(), LedgerError> {
        let mut running = Decimal::ZERO;
        for (index, tx) in self.transactions.iter().enumerate() {
            let expected_sequence = index as u64 + 1;
            if tx.sequence != expected_sequence {
                return Err(violation(format!(
                    "sequence {} at position {expected_sequence}",
                    tx.sequence
                )));
            }
            if tx.balance_id != self.balance.id {
                return Err(violation(format!("entry {} belongs to another row", tx.sequence)));
            }
            if tx.balance_before != running {
                return Err(violation(format!(
                    "entry {} starts at {} but chain is at {running}",
                    tx.sequence, tx.balance_before
                )));
            }
            if tx.balance_after != tx.balance_before + tx.amount {
                return Err(violation(format!("entry {} does not add up", tx.sequence)));
            }
            running = tx.balance_after;
        }

        if running != self.balance.balance {
            return Err(violation(format!(
                "chain ends at {running} but row holds {}",
                self.balance.balance
            )));
        }
        if self.balance.component_total() != self.balance.balance {
            return Err(violation(format!(
                "components sum to {} but row holds {}",
                self.balance.component_total(),
                self.balance.balance
            )));
        }

        let held: Decimal = self
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Held)
            .map(|r| r.days)
            .sum();
        if held != self.balance.pending_balance {
            return Err(violation(format!(
                "held reservations total {held} but pending is {}",
                self.balance.pending_balance
            )));
        }
        Ok(())
    }
}

fn violation(detail: String) -> LedgerError {
    LedgerError::InvariantViolation(detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_shared::types::{LeaveTypeId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger_with(initial: Decimal) -> BalanceLedger {
        let key = BalanceKey::new(UserId::new(), LeaveTypeId::new(), 2026);
        BalanceLedger::open(key, date(2026, 1, 1), initial, Utc::now()).unwrap()
    }

    #[test]
    fn test_open_seeds_initial_allocation() {
        let ledger = ledger_with(dec!(10));
        assert_eq!(ledger.balance().balance, dec!(10));
        assert_eq!(ledger.balance().initial_balance, dec!(10));
        assert_eq!(ledger.transactions().len(), 1);
        let tx = &ledger.transactions()[0];
        assert_eq!(tx.transaction_type, TransactionType::Adjustment);
        assert_eq!(tx.description, INITIAL_ALLOCATION);
        assert_eq!(tx.sequence, 1);
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_open_without_allocation_writes_nothing() {
        let ledger = ledger_with(Decimal::ZERO);
        assert!(ledger.transactions().is_empty());
        assert_eq!(ledger.balance().last_accrual_date, Some(date(2026, 1, 1)));
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_reserve_holds_pending_only() {
        let mut ledger = ledger_with(dec!(10));
        let reservation = ledger.reserve(dec!(4), Decimal::ZERO, None, Utc::now()).unwrap();

        assert_eq!(reservation.status, ReservationStatus::Held);
        assert_eq!(ledger.balance().pending_balance, dec!(4));
        assert_eq!(ledger.balance().balance, dec!(10));
        assert_eq!(ledger.balance().available(), dec!(6));
        assert_eq!(ledger.transactions().len(), 1);
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_reserve_rejects_overdraw() {
        let mut ledger = ledger_with(dec!(10));
        let err = ledger.reserve(dec!(12), Decimal::ZERO, None, Utc::now()).unwrap_err();
        match err {
            LedgerError::InsufficientBalance {
                requested,
                available,
            } => {
                assert_eq!(requested, dec!(12));
                assert_eq!(available, dec!(10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ledger.balance().pending_balance, Decimal::ZERO);
    }

    #[test]
    fn test_reserve_counts_pending_against_floor() {
        let mut ledger = ledger_with(dec!(2));
        ledger.reserve(dec!(4), dec!(-3), None, Utc::now()).unwrap();
        let err = ledger.reserve(dec!(2), dec!(-3), None, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert!(ledger.reserve(dec!(1), dec!(-3), None, Utc::now()).is_ok());
    }

    #[test]
    fn test_reserve_rejects_non_positive() {
        let mut ledger = ledger_with(dec!(10));
        assert!(matches!(
            ledger.reserve(Decimal::ZERO, Decimal::ZERO, None, Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_commit_writes_usage_once() {
        let mut ledger = ledger_with(dec!(10));
        let request_id = RequestId::new();
        let reservation = ledger
            .reserve(dec!(8), Decimal::ZERO, Some(request_id), Utc::now())
            .unwrap();

        let first = ledger.commit(reservation.id, date(2026, 3, 2), Utc::now()).unwrap();
        assert!(first.newly_committed);
        assert_eq!(ledger.balance().balance, dec!(2));
        assert_eq!(ledger.balance().used_balance, dec!(8));
        assert_eq!(ledger.balance().pending_balance, Decimal::ZERO);

        let usage = ledger.transactions().last().unwrap();
        assert_eq!(usage.amount, dec!(-8));
        assert_eq!(usage.request_id, Some(request_id));

        let second = ledger.commit(reservation.id, date(2026, 3, 2), Utc::now()).unwrap();
        assert!(!second.newly_committed);
        assert_eq!(second.transaction_id, first.transaction_id);
        assert_eq!(ledger.transactions().len(), 2);
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_release_is_idempotent_and_writes_nothing() {
        let mut ledger = ledger_with(dec!(10));
        let reservation = ledger.reserve(dec!(3), Decimal::ZERO, None, Utc::now()).unwrap();

        assert!(ledger.release(reservation.id, Utc::now()).unwrap());
        assert!(!ledger.release(reservation.id, Utc::now()).unwrap());
        assert_eq!(ledger.balance().pending_balance, Decimal::ZERO);
        assert_eq!(ledger.balance().balance, dec!(10));
        assert_eq!(ledger.transactions().len(), 1);
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_settled_reservation_cannot_flip() {
        let mut ledger = ledger_with(dec!(10));
        let released = ledger.reserve(dec!(1), Decimal::ZERO, None, Utc::now()).unwrap();
        ledger.release(released.id, Utc::now()).unwrap();
        assert!(matches!(
            ledger.commit(released.id, date(2026, 2, 2), Utc::now()),
            Err(LedgerError::InvalidTransition { .. })
        ));

        let committed = ledger.reserve(dec!(1), Decimal::ZERO, None, Utc::now()).unwrap();
        ledger.commit(committed.id, date(2026, 2, 2), Utc::now()).unwrap();
        assert!(matches!(
            ledger.release(committed.id, Utc::now()),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_unknown_reservation() {
        let mut ledger = ledger_with(dec!(10));
        assert!(matches!(
            ledger.release(ReservationId::new(), Utc::now()),
            Err(LedgerError::ReservationNotFound(_))
        ));
    }

    #[test]
    fn test_adjust_and_reset() {
        let mut ledger = ledger_with(dec!(10));
        ledger.adjust(dec!(2.5), "correction", date(2026, 4, 1), Utc::now()).unwrap();
        assert_eq!(ledger.balance().balance, dec!(12.5));
        assert_eq!(ledger.balance().adjusted_balance, dec!(2.5));

        let reset = ledger.reset(dec!(5), "policy change", date(2026, 4, 2), Utc::now()).unwrap();
        assert_eq!(reset.amount, dec!(-7.5));
        assert_eq!(reset.transaction_type, TransactionType::Reset);
        assert_eq!(ledger.balance().balance, dec!(5));
        assert!(ledger.reconcile().is_ok());
    }

    #[test]
    fn test_adjust_requires_reason_and_amount() {
        let mut ledger = ledger_with(dec!(10));
        assert!(matches!(
            ledger.adjust(dec!(1), "  ", date(2026, 4, 1), Utc::now()),
            Err(LedgerError::ReasonRequired)
        ));
        assert!(matches!(
            ledger.adjust(Decimal::ZERO, "x", date(2026, 4, 1), Utc::now()),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_reconcile_detects_tampering() {
        let mut ledger = ledger_with(dec!(10));
        ledger.balance.balance = dec!(11);
        assert!(matches!(ledger.reconcile(), Err(LedgerError::InvariantViolation(_))));

        let mut ledger = ledger_with(dec!(10));
        ledger.adjust(dec!(1), "x", date(2026, 2, 1), Utc::now()).unwrap();
        ledger.transactions[1].sequence = 3;
        assert!(ledger.reconcile().unwrap_err().is_fatal());

        let mut ledger = ledger_with(dec!(10));
        ledger.balance.pending_balance = dec!(1);
        assert!(ledger.reconcile().is_err());
    }
}
