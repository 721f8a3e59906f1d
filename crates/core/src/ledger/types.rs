//! Ledger domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use accrue_shared::types::{
    BalanceId, LeaveTypeId, RequestId, ReservationId, TransactionId, UserId,
};

/// Identifies one yearly balance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceKey {
    /// The employee.
    pub user_id: UserId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Calendar year of the row.
    pub year: i32,
}

impl BalanceKey {
    /// Creates a new balance key.
    #[must_use]
    pub const fn new(user_id: UserId, leave_type_id: LeaveTypeId, year: i32) -> Self {
        Self {
            user_id,
            leave_type_id,
            year,
        }
    }

    /// Returns the key of the following year.
    #[must_use]
    pub const fn next_year(&self) -> Self {
        Self::new(self.user_id, self.leave_type_id, self.year + 1)
    }

    /// January 1st of the row's year.
    #[must_use]
    pub fn year_start(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 1, 1)
    }

    /// December 31st of the row's year.
    #[must_use]
    pub fn year_end(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, 12, 31)
    }
}

impl std::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.leave_type_id, self.year)
    }
}

/// Kind of ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Periodic accrual.
    Accrual,
    /// Approved leave consumed.
    Usage,
    /// Manual or initial allocation change.
    Adjustment,
    /// Administrative reset to a target balance.
    Reset,
    /// Days carried in from the previous year.
    Rollover,
    /// Service-years bonus.
    Bonus,
    /// Days lost at year end.
    Forfeiture,
}

impl TransactionType {
    /// Returns the string representation of the transaction type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accrual => "accrual",
            Self::Usage => "usage",
            Self::Adjustment => "adjustment",
            Self::Reset => "reset",
            Self::Rollover => "rollover",
            Self::Bonus => "bonus",
            Self::Forfeiture => "forfeiture",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only ledger entry for one balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// The balance row this entry belongs to.
    pub balance_id: BalanceId,
    /// Dense, 1-based position within the row.
    pub sequence: u64,
    /// Kind of event.
    pub transaction_type: TransactionType,
    /// Signed amount in days.
    pub amount: Decimal,
    /// Balance before this entry.
    pub balance_before: Decimal,
    /// Balance after this entry.
    pub balance_after: Decimal,
    /// Originating request, for usage entries.
    pub request_id: Option<RequestId>,
    /// Business date of the event.
    pub effective_date: NaiveDate,
    /// Human readable description.
    pub description: String,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a pending-balance hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Counted in pending balance.
    Held,
    /// Converted into a usage entry.
    Committed,
    /// Returned without consuming balance.
    Released,
}

impl ReservationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Committed => "committed",
            Self::Released => "released",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hold on balance for a pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique identifier.
    pub id: ReservationId,
    /// The balance row holding the days.
    pub key: BalanceKey,
    /// The request the hold is for.
    pub request_id: Option<RequestId>,
    /// Days held.
    pub days: Decimal,
    /// Current state.
    pub status: ReservationStatus,
    /// Usage entry written on commit.
    pub usage_transaction_id: Option<TransactionId>,
    /// When the hold was placed.
    pub created_at: DateTime<Utc>,
    /// When the hold left `Held`.
    pub settled_at: Option<DateTime<Utc>>,
}

/// One balance row.
///
/// `balance == initial + accrued + rollover + bonus + adjusted - used - forfeited`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Unique identifier.
    pub id: BalanceId,
    /// Row key.
    pub key: BalanceKey,
    /// Current balance in days.
    pub balance: Decimal,
    /// Days held by pending requests.
    pub pending_balance: Decimal,
    /// Days granted when the row was opened.
    pub initial_balance: Decimal,
    /// Days accrued.
    pub accrued_balance: Decimal,
    /// Days carried in.
    pub rollover_balance: Decimal,
    /// Bonus days.
    pub bonus_balance: Decimal,
    /// Net manual adjustments and resets.
    pub adjusted_balance: Decimal,
    /// Days consumed (positive).
    pub used_balance: Decimal,
    /// Days forfeited (positive).
    pub forfeited_balance: Decimal,
    /// Last materialized accrual boundary, or the row anchor.
    pub last_accrual_date: Option<NaiveDate>,
    /// Accrual boundary at which this year's bonus was granted.
    pub bonus_granted_on: Option<NaiveDate>,
    /// Set once the year-end rollover has run.
    pub rolled_over_on: Option<NaiveDate>,
    /// When the row was opened.
    pub created_at: DateTime<Utc>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// Days still available for new requests.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.balance - self.pending_balance
    }

    /// Sum of the components, which must equal `balance`.
    #[must_use]
    pub fn component_total(&self) -> Decimal {
        self.initial_balance
            + self.accrued_balance
            + self.rollover_balance
            + self.bonus_balance
            + self.adjusted_balance
            - self.used_balance
            - self.forfeited_balance
    }
}

/// Read view of a balance row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// The employee.
    pub user_id: UserId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Calendar year.
    pub year: i32,
    /// Current balance.
    pub balance: Decimal,
    /// Days held by pending requests.
    pub pending_balance: Decimal,
    /// `balance - pending_balance`.
    pub available: Decimal,
    /// Initial allocation.
    pub initial_balance: Decimal,
    /// Accrued days.
    pub accrued_balance: Decimal,
    /// Days carried in.
    pub rollover_balance: Decimal,
    /// Bonus days.
    pub bonus_balance: Decimal,
    /// Net adjustments.
    pub adjusted_balance: Decimal,
    /// Days used.
    pub used_balance: Decimal,
    /// Days forfeited.
    pub forfeited_balance: Decimal,
    /// Last accrual boundary.
    pub last_accrual_date: Option<NaiveDate>,
    /// Year-end rollover marker.
    pub rolled_over_on: Option<NaiveDate>,
    /// Number of ledger entries.
    pub transaction_count: u64,
}

/// Result of an accrual run on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualOutcome {
    /// Row that accrued.
    pub key: BalanceKey,
    /// Periods materialized.
    pub periods: u32,
    /// Days accrued.
    pub accrued: Decimal,
    /// Bonus days granted.
    pub bonus: Decimal,
    /// Last boundary reached.
    pub accrued_through: Option<NaiveDate>,
}

impl AccrualOutcome {
    /// True when the run changed nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.periods == 0
    }
}

/// Carry and forfeit amounts for a closing year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolloverPlan {
    /// Balance at year end.
    pub closing_balance: Decimal,
    /// Days still held by undecided requests; they stay on the closing row.
    pub held: Decimal,
    /// Days carried into the next year (negative for debt).
    pub carry: Decimal,
    /// Days forfeited (never negative).
    pub forfeit: Decimal,
}

/// Result of a year-end rollover request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RolloverOutcome {
    /// The rollover ran now.
    Processed {
        /// Closing row.
        key: BalanceKey,
        /// Amounts moved.
        plan: RolloverPlan,
    },
    /// The row had already been rolled over.
    AlreadyProcessed {
        /// Closing row.
        key: BalanceKey,
        /// Date recorded by the earlier run.
        rolled_over_on: NaiveDate,
    },
}
