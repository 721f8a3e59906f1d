//! Ledger error types.
//!
//! `InvariantViolation` is the only fatal variant: it means a unit of work
//! produced a row that no longer reconciles with its transaction chain.

use rust_decimal::Decimal;
use thiserror::Error;

use accrue_shared::types::{LeaveTypeId, ReservationId};

use crate::ledger::types::{BalanceKey, ReservationStatus};

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Balance Errors ==========
    /// Not enough balance for the requested days.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Days requested.
        requested: Decimal,
        /// Days available (balance minus pending).
        available: Decimal,
    },

    /// The leave type does not track a balance.
    #[error("Leave type {0} does not track a balance")]
    BalanceNotTracked(LeaveTypeId),

    /// No balance row exists for the key.
    #[error("Balance {0} not found")]
    BalanceNotFound(BalanceKey),

    /// The row's year has been rolled over and takes no new holds.
    #[error("Balance {0} is closed for the year")]
    YearClosed(BalanceKey),

    /// Amount is zero, negative where positive is required, or malformed.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Adjustments and resets need a reason.
    #[error("A reason is required")]
    ReasonRequired,

    // ========== Reservation Errors ==========
    /// Reservation not found.
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),

    /// A settled reservation was asked to settle the other way.
    #[error("Reservation {reservation_id} is {from} and cannot become {to}")]
    InvalidTransition {
        /// The reservation.
        reservation_id: ReservationId,
        /// Current state.
        from: ReservationStatus,
        /// Requested state.
        to: ReservationStatus,
    },

    // ========== Calendar Errors ==========
    /// Date arithmetic left the supported calendar range.
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    // ========== Fatal ==========
    /// The row no longer reconciles with its transaction chain.
    #[error("Ledger invariant violated: {0}")]
    InvariantViolation(String),
}

impl LedgerError {
    /// Returns true for errors that indicate corrupted ledger state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::ReasonRequired | Self::DateOutOfRange(_) => 400,
            Self::BalanceNotFound(_) | Self::ReservationNotFound(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::InsufficientBalance { .. } | Self::BalanceNotTracked(_) | Self::YearClosed(_) => {
                422
            }
            Self::InvariantViolation(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::BalanceNotTracked(_) => "BALANCE_NOT_TRACKED",
            Self::BalanceNotFound(_) => "BALANCE_NOT_FOUND",
            Self::YearClosed(_) => "YEAR_CLOSED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DateOutOfRange(_) => "DATE_OUT_OF_RANGE",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
        }
    }
}
