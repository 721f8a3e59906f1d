//! Leave balance ledger.
//!
//! This module implements balance accounting:
//! - Yearly balance rows with an append-only transaction chain
//! - Reservations of pending leave (reserve, commit, release)
//! - Calendar-aligned accrual and service-year bonuses
//! - Year-end rollover and forfeiture
//! - Reconciliation of a row against its chain

pub mod accrual;
pub mod balance;
pub mod error;
pub mod rollover;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use accrual::AccrualEngine;
pub use balance::{BalanceLedger, CommitOutcome, INITIAL_ALLOCATION};
pub use error::LedgerError;
pub use rollover::RolloverService;
pub use service::LedgerService;
pub use types::{
    AccrualOutcome, Balance, BalanceKey, BalanceSnapshot, LedgerTransaction, Reservation,
    ReservationStatus, RolloverOutcome, RolloverPlan, TransactionType,
};
