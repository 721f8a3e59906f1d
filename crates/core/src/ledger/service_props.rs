//! Property-based tests for the balance ledger.
//!
//! - Reconciliation holds after any sequence of operations
//! - Holds never push `balance - pending` below the floor
//! - Accrual up to a date is idempotent and order independent

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use accrue_shared::types::{LeaveTypeId, PolicyId, UserId};

use super::accrual::AccrualEngine;
use super::balance::BalanceLedger;
use super::types::{BalanceKey, ReservationStatus};
use crate::policy::{AccrualFrequency, Policy};

#[derive(Debug, Clone)]
enum Op {
    Reserve(Decimal),
    Commit(usize),
    Release(usize),
    Adjust(Decimal),
    Reset(Decimal),
}

/// Half-day granular amounts from 0.5 to 10.0.
fn days() -> impl Strategy<Value = Decimal> {
    (1i64..=20).prop_map(|halves| Decimal::new(halves * 5, 1))
}

fn signed_days() -> impl Strategy<Value = Decimal> {
    (-20i64..=20)
        .prop_filter("non-zero", |v| *v != 0)
        .prop_map(|halves| Decimal::new(halves * 5, 1))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => days().prop_map(Op::Reserve),
        2 => (0usize..8).prop_map(Op::Commit),
        2 => (0usize..8).prop_map(Op::Release),
        1 => signed_days().prop_map(Op::Adjust),
        1 => (0i64..=40).prop_map(|halves| Op::Reset(Decimal::new(halves * 5, 1))),
    ]
}

fn floor() -> impl Strategy<Value = Decimal> {
    prop_oneof![Just(Decimal::ZERO), (1i64..=5).prop_map(|d| -Decimal::from(d))]
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn monthly_policy(annual: Decimal) -> Policy {
    Policy {
        id: PolicyId::new(),
        user_id: UserId::new(),
        leave_type_id: LeaveTypeId::new(),
        initial_days: Decimal::ZERO,
        annual_accrual_amount: annual,
        bonus_days_per_year: Decimal::ZERO,
        years_for_bonus: 0,
        accrual_frequency: AccrualFrequency::Monthly,
        rollover_enabled: false,
        max_rollover_days: None,
        max_negative_balance: Decimal::ZERO,
        prorate_first_year: false,
        effective_date: date(2026, 1, 1),
        end_date: None,
        created_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any operation sequence leaves a reconciled row whose available
    /// balance never crosses the floor through a hold.
    #[test]
    fn prop_operations_preserve_reconciliation(
        initial in (0i64..=30).prop_map(Decimal::from),
        floor in floor(),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let key = BalanceKey::new(UserId::new(), LeaveTypeId::new(), 2026);
        let mut ledger = BalanceLedger::open(key, date(2026, 1, 1), initial, Utc::now()).unwrap();
        let mut holds = Vec::new();

        for op in ops {
            match op {
                Op::Reserve(d) => {
                    let before = ledger.balance().available();
                    match ledger.reserve(d, floor, None, Utc::now()) {
                        Ok(r) => {
                            prop_assert!(before - d >= floor);
                            holds.push(r.id);
                        }
                        Err(_) => prop_assert!(before - d < floor),
                    }
                }
                Op::Commit(i) => {
                    if let Some(id) = holds.get(i % holds.len().max(1)).copied() {
                        let _ = ledger.commit(id, date(2026, 6, 1), Utc::now());
                    }
                }
                Op::Release(i) => {
                    if let Some(id) = holds.get(i % holds.len().max(1)).copied() {
                        let _ = ledger.release(id, Utc::now());
                    }
                }
                Op::Adjust(a) => {
                    ledger.adjust(a, "prop", date(2026, 6, 1), Utc::now()).unwrap();
                }
                Op::Reset(t) => {
                    ledger.reset(t, "prop", date(2026, 6, 1), Utc::now()).unwrap();
                    prop_assert_eq!(ledger.balance().balance, t);
                }
            }
            prop_assert!(ledger.reconcile().is_ok());
        }

        let committed: Decimal = ledger
            .reservations()
            .filter(|r| r.status == ReservationStatus::Committed)
            .map(|r| r.days)
            .sum();
        prop_assert_eq!(ledger.balance().used_balance, committed);
    }

    /// Accruing in several steps equals accruing once to the final date.
    #[test]
    fn prop_accrual_is_path_independent(
        annual in (0i64..=40).prop_map(Decimal::from),
        stops in prop::collection::vec(1u32..=12, 0..6),
        last in 1u32..=12,
    ) {
        let policy = monthly_policy(annual);
        let key = BalanceKey::new(policy.user_id, policy.leave_type_id, 2026);
        let as_of = date(2026, last, 1);

        let mut stepped = BalanceLedger::open(key, date(2026, 1, 1), Decimal::ZERO, Utc::now()).unwrap();
        let mut stops = stops;
        stops.sort_unstable();
        for month in stops.into_iter().filter(|m| *m <= last) {
            AccrualEngine::accrue(&mut stepped, &policy, None, date(2026, month, 1), Utc::now()).unwrap();
        }
        AccrualEngine::accrue(&mut stepped, &policy, None, as_of, Utc::now()).unwrap();

        let mut once = BalanceLedger::open(key, date(2026, 1, 1), Decimal::ZERO, Utc::now()).unwrap();
        AccrualEngine::accrue(&mut once, &policy, None, as_of, Utc::now()).unwrap();

        prop_assert_eq!(stepped.balance().balance, once.balance().balance);
        prop_assert_eq!(stepped.balance().last_accrual_date, once.balance().last_accrual_date);
        prop_assert!(stepped.reconcile().is_ok());

        let rerun = AccrualEngine::accrue(&mut once, &policy, None, as_of, Utc::now()).unwrap();
        prop_assert!(rerun.is_noop());
    }
}
