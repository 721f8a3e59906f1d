//! Balance repository: per-row atomic units over the leave ledger.
//!
//! Every mutation locks the row, works on a copy, reconciles the copy and
//! only then swaps it in. A copy that fails reconciliation is dropped and
//! the failure is logged at `error` level.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use accrue_core::directory::{DirectoryError, OrgDirectory};
use accrue_core::ledger::{
    AccrualEngine, AccrualOutcome, BalanceKey, BalanceLedger, BalanceSnapshot, CommitOutcome,
    LedgerError, LedgerService, LedgerTransaction, Reservation, RolloverOutcome, RolloverService,
};
use accrue_core::policy::{LeaveType, Policy, PolicyError};
use accrue_shared::types::{
    LeaveTypeId, PageRequest, PageResponse, RequestId, ReservationId, UserId,
};

use super::policy::PolicyRepository;
use crate::store::{BalanceHandle, Store};

/// Errors from balance operations that need catalog or directory lookups.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Ledger rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Leave type or policy lookup failed.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Hire date lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl BalanceError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Ledger(e) => e.status_code(),
            Self::Policy(e) => e.status_code(),
            Self::Directory(e) => e.status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::Policy(e) => e.error_code(),
            Self::Directory(e) => e.error_code(),
        }
    }
}

/// A row the accrual run could not process.
#[derive(Debug, Clone, Serialize)]
pub struct AccrualFailure {
    /// The row.
    pub key: BalanceKey,
    /// Error code.
    pub code: &'static str,
    /// Error message.
    pub message: String,
}

/// Result of one accrual run.
#[derive(Debug, Clone, Serialize)]
pub struct AccrualRun {
    /// The run date.
    pub as_of: NaiveDate,
    /// Rows examined.
    pub rows_examined: usize,
    /// Rows that received at least one entry.
    pub outcomes: Vec<AccrualOutcome>,
    /// Rows that failed.
    pub failures: Vec<AccrualFailure>,
}

/// Result of closing every row of a year.
#[derive(Debug, Clone, Serialize)]
pub struct RolloverRun {
    /// The closed year.
    pub year: i32,
    /// One outcome per row.
    pub outcomes: Vec<RolloverOutcome>,
    /// Rows that failed.
    pub failures: Vec<AccrualFailure>,
}

/// Balance repository.
#[derive(Clone)]
pub struct BalanceRepository {
    store: Store,
    policies: PolicyRepository,
    directory: Arc<dyn OrgDirectory>,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub fn new(store: Store, directory: Arc<dyn OrgDirectory>) -> Self {
        Self {
            policies: PolicyRepository::new(store.clone()),
            store,
            directory,
        }
    }

    /// Holds `days` against the row charged for a request starting on
    /// `start_date`.
    ///
    /// # Errors
    ///
    /// Returns `BalanceNotTracked`, `PolicyNotFound` or `InsufficientBalance`.
    pub async fn reserve(
        &self,
        user_id: UserId,
        leave_type: &LeaveType,
        start_date: NaiveDate,
        days: Decimal,
        request_id: Option<RequestId>,
    ) -> Result<Reservation, BalanceError> {
        if !leave_type.uses_balance {
            return Err(LedgerError::BalanceNotTracked(leave_type.id).into());
        }
        let policy = self
            .policies
            .policy_as_of(user_id, leave_type.id, start_date)?;
        let key = BalanceKey::new(
            user_id,
            leave_type.id,
            LedgerService::balance_year(start_date),
        );
        let floor = LedgerService::balance_floor(leave_type, &policy);
        let handle = self.row(key, leave_type, Some(&policy))?;

        let reservation = apply(&handle, |row| {
            row.reserve(days, floor, request_id, Utc::now())
        })
        .await?;
        self.store.reservations.insert(reservation.id, key);

        debug!(
            reservation_id = %reservation.id,
            key = %key,
            days = %days,
            "days reserved"
        );
        Ok(reservation)
    }

    /// Converts a held reservation into a usage entry. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ReservationNotFound` or `InvalidTransition` after a release.
    pub async fn commit(
        &self,
        reservation_id: ReservationId,
        effective_date: NaiveDate,
    ) -> Result<CommitOutcome, LedgerError> {
        let handle = self.reservation_row(reservation_id)?;
        let outcome = apply(&handle, |row| {
            row.commit(reservation_id, effective_date, Utc::now())
        })
        .await?;
        if outcome.newly_committed {
            debug!(
                reservation_id = %reservation_id,
                transaction_id = %outcome.transaction_id,
                "reservation committed"
            );
        }
        Ok(outcome)
    }

    /// Drops a held reservation. Idempotent.
    ///
    /// Returns false when it had already been released.
    ///
    /// # Errors
    ///
    /// Returns `ReservationNotFound` or `InvalidTransition` after a commit.
    pub async fn release(&self, reservation_id: ReservationId) -> Result<bool, LedgerError> {
        let handle = self.reservation_row(reservation_id)?;
        let released = apply(&handle, |row| row.release(reservation_id, Utc::now())).await?;
        if released {
            debug!(reservation_id = %reservation_id, "reservation released");
        }
        Ok(released)
    }

    /// Looks up a reservation.
    pub async fn reservation(&self, reservation_id: ReservationId) -> Option<Reservation> {
        let handle = self.reservation_row(reservation_id).ok()?;
        let row = handle.lock().await;
        row.reservation(reservation_id).cloned()
    }

    /// Accrues every policy effective on `as_of`.
    ///
    /// The previous year's row is caught up too while it is still open, so
    /// a run on January 1st books the closing period of the old year.
    pub async fn run_accrual(&self, as_of: NaiveDate) -> AccrualRun {
        let mut run = AccrualRun {
            as_of,
            rows_examined: 0,
            outcomes: Vec::new(),
            failures: Vec::new(),
        };

        for policy in self.policies.active_policies_as_of(as_of) {
            let current = BalanceKey::new(policy.user_id, policy.leave_type_id, as_of.year());
            let previous = BalanceKey::new(policy.user_id, policy.leave_type_id, as_of.year() - 1);

            let mut targets = Vec::with_capacity(2);
            if self.store.balance_handle(&previous).is_some()
                && let Some(closing_policy) = self.closing_policy(previous)
            {
                targets.push((previous, closing_policy));
            }
            targets.push((current, policy));

            for (key, policy) in targets {
                run.rows_examined += 1;
                match self.accrue_row(key, &policy, as_of).await {
                    Ok(outcome) if outcome.is_noop() => {}
                    Ok(outcome) => run.outcomes.push(outcome),
                    Err(BalanceError::Ledger(LedgerError::BalanceNotTracked(_))) => {}
                    Err(err) => {
                        warn!(key = %key, error = %err, "accrual failed for row");
                        run.failures.push(AccrualFailure {
                            key,
                            code: err.error_code(),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            as_of = %as_of,
            rows = run.rows_examined,
            accrued = run.outcomes.len(),
            failed = run.failures.len(),
            "accrual run finished"
        );
        run
    }

    async fn accrue_row(
        &self,
        key: BalanceKey,
        policy: &Policy,
        as_of: NaiveDate,
    ) -> Result<AccrualOutcome, BalanceError> {
        let leave_type = self.policies.leave_type(key.leave_type_id).await?;
        let hire_date = self.hire_date(key.user_id)?;
        let handle = self.row(key, &leave_type, Some(policy))?;

        let outcome = apply(&handle, |row| {
            if row.balance().rolled_over_on.is_some() {
                return Ok(AccrualOutcome {
                    key,
                    periods: 0,
                    accrued: Decimal::ZERO,
                    bonus: Decimal::ZERO,
                    accrued_through: row.balance().last_accrual_date,
                });
            }
            AccrualEngine::accrue(row, policy, hire_date, as_of, Utc::now())
        })
        .await?;
        Ok(outcome)
    }

    /// Closes one row's year and carries the allowed days forward.
    ///
    /// The closing row is first accrued through January 1st of the next
    /// year. Re-running reports `AlreadyProcessed` and writes nothing.
    ///
    /// # Errors
    ///
    /// Returns `BalanceNotFound` when the row was never opened.
    pub async fn rollover_year_end(
        &self,
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        year: i32,
    ) -> Result<RolloverOutcome, BalanceError> {
        let key = BalanceKey::new(user_id, leave_type_id, year);
        let closing = self
            .store
            .balance_handle(&key)
            .ok_or(LedgerError::BalanceNotFound(key))?;
        let leave_type = self.policies.leave_type(leave_type_id).await?;
        let closing_policy = self.closing_policy(key);
        let next_key = key.next_year();
        let next_policy = self
            .policies
            .policy_for_year(user_id, leave_type_id, next_key.year);
        let next_year_start = next_key
            .year_start()
            .ok_or_else(|| LedgerError::DateOutOfRange(format!("year {}", next_key.year)))?;
        let hire_date = self.hire_date(user_id)?;

        // Rows are always locked in ascending year order.
        let mut closing_row = closing.lock().await;
        if let Some(rolled_over_on) = closing_row.balance().rolled_over_on {
            return Ok(RolloverOutcome::AlreadyProcessed {
                key,
                rolled_over_on,
            });
        }
        let next = self.row(next_key, &leave_type, next_policy.as_ref())?;
        let mut next_row = next.lock().await;

        let now = Utc::now();
        let mut closing_work = closing_row.clone();
        let mut next_work = next_row.clone();
        if let Some(policy) = &closing_policy {
            AccrualEngine::accrue(&mut closing_work, policy, hire_date, next_year_start, now)?;
        }
        let outcome =
            RolloverService::close_year(&mut closing_work, &leave_type, closing_policy.as_ref(), now)?;
        if let RolloverOutcome::Processed { plan, .. } = &outcome {
            RolloverService::carry_forward(&mut next_work, plan, now)?;
            info!(
                key = %key,
                carried = %plan.carry,
                forfeited = %plan.forfeit,
                "year closed"
            );
        }
        verify(&closing_work)?;
        verify(&next_work)?;
        *closing_row = closing_work;
        *next_row = next_work;

        Ok(outcome)
    }

    /// Closes every open row of `year`.
    pub async fn rollover_all(&self, year: i32) -> RolloverRun {
        let keys: Vec<BalanceKey> = self
            .store
            .balances
            .iter()
            .map(|entry| *entry.key())
            .filter(|key| key.year == year)
            .collect();

        let mut run = RolloverRun {
            year,
            outcomes: Vec::with_capacity(keys.len()),
            failures: Vec::new(),
        };
        for key in keys {
            match self
                .rollover_year_end(key.user_id, key.leave_type_id, key.year)
                .await
            {
                Ok(outcome) => run.outcomes.push(outcome),
                Err(err) => {
                    warn!(key = %key, error = %err, "rollover failed for row");
                    run.failures.push(AccrualFailure {
                        key,
                        code: err.error_code(),
                        message: err.to_string(),
                    });
                }
            }
        }
        run
    }

    /// Writes a manual adjustment of `amount` days.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `ReasonRequired` or a lookup error.
    pub async fn adjust(
        &self,
        key: BalanceKey,
        amount: Decimal,
        reason: &str,
        effective_date: Option<NaiveDate>,
    ) -> Result<LedgerTransaction, BalanceError> {
        let handle = self.open_for_admin(key).await?;
        let date = effective_in_year(key, effective_date)?;
        let transaction = apply(&handle, |row| row.adjust(amount, reason, date, Utc::now())).await?;
        info!(key = %key, amount = %amount, transaction_id = %transaction.id, "balance adjusted");
        Ok(transaction)
    }

    /// Sets the balance to `target` days, writing the difference.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` or a lookup error.
    pub async fn reset(
        &self,
        key: BalanceKey,
        target: Decimal,
        reason: &str,
        effective_date: Option<NaiveDate>,
    ) -> Result<LedgerTransaction, BalanceError> {
        let handle = self.open_for_admin(key).await?;
        let date = effective_in_year(key, effective_date)?;
        let transaction = apply(&handle, |row| row.reset(target, reason, date, Utc::now())).await?;
        info!(key = %key, target = %target, transaction_id = %transaction.id, "balance reset");
        Ok(transaction)
    }

    /// Current state of a row.
    ///
    /// # Errors
    ///
    /// Returns `BalanceNotFound` when the row was never opened.
    pub async fn get_balance(&self, key: BalanceKey) -> Result<BalanceSnapshot, LedgerError> {
        let handle = self
            .store
            .balance_handle(&key)
            .ok_or(LedgerError::BalanceNotFound(key))?;
        let row = handle.lock().await;
        Ok(row.snapshot())
    }

    /// A page of the row's transactions in sequence order.
    ///
    /// # Errors
    ///
    /// Returns `BalanceNotFound` when the row was never opened.
    pub async fn list_transactions(
        &self,
        key: BalanceKey,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError> {
        let handle = self
            .store
            .balance_handle(&key)
            .ok_or(LedgerError::BalanceNotFound(key))?;
        let row = handle.lock().await;
        let page = PageRequest::new(page.page, page.per_page);
        let transactions = row.transactions();
        let total = u64::try_from(transactions.len()).unwrap_or(u64::MAX);
        Ok(PageResponse::new(
            page.slice(transactions),
            page.page,
            page.per_page,
            total,
        ))
    }

    fn row(
        &self,
        key: BalanceKey,
        leave_type: &LeaveType,
        policy: Option<&Policy>,
    ) -> Result<BalanceHandle, LedgerError> {
        if let Some(handle) = self.store.balance_handle(&key) {
            return Ok(handle);
        }
        let entry = self.store.balances.entry(key).or_try_insert_with(|| {
            LedgerService::open_row(key, leave_type, policy, Utc::now())
                .map(|ledger| Arc::new(Mutex::new(ledger)))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    async fn open_for_admin(&self, key: BalanceKey) -> Result<BalanceHandle, BalanceError> {
        if let Some(handle) = self.store.balance_handle(&key) {
            return Ok(handle);
        }
        let leave_type = self.policies.leave_type(key.leave_type_id).await?;
        let policy = self
            .policies
            .policy_for_year(key.user_id, key.leave_type_id, key.year);
        Ok(self.row(key, &leave_type, policy.as_ref())?)
    }

    fn reservation_row(&self, reservation_id: ReservationId) -> Result<BalanceHandle, LedgerError> {
        let key = self
            .store
            .reservations
            .get(&reservation_id)
            .map(|entry| *entry.value())
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;
        self.store
            .balance_handle(&key)
            .ok_or(LedgerError::BalanceNotFound(key))
    }

    fn closing_policy(&self, key: BalanceKey) -> Option<Policy> {
        let year_end = key.year_end()?;
        self.policies
            .policy_as_of(key.user_id, key.leave_type_id, year_end)
            .ok()
            .or_else(|| {
                self.policies
                    .policy_for_year(key.user_id, key.leave_type_id, key.year)
            })
    }

    fn hire_date(&self, user_id: UserId) -> Result<Option<NaiveDate>, DirectoryError> {
        match self.directory.profile(user_id) {
            Ok(profile) => Ok(profile.hire_date),
            Err(DirectoryError::UserNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Runs `op` on a copy of the row and swaps the copy in once it reconciles.
async fn apply<T>(
    handle: &BalanceHandle,
    op: impl FnOnce(&mut BalanceLedger) -> Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    let mut row = handle.lock().await;
    let mut working = row.clone();
    let value = op(&mut working)?;
    verify(&working)?;
    *row = working;
    Ok(value)
}

fn verify(ledger: &BalanceLedger) -> Result<(), LedgerError> {
    ledger.reconcile().inspect_err(|err| {
        error!(
            key = %ledger.key(),
            error = %err,
            "balance row failed reconciliation, unit aborted"
        );
    })
}

/// `date` (default today) clamped into the row's year.
fn effective_in_year(key: BalanceKey, date: Option<NaiveDate>) -> Result<NaiveDate, LedgerError> {
    let (Some(start), Some(end)) = (key.year_start(), key.year_end()) else {
        return Err(LedgerError::DateOutOfRange(format!("year {}", key.year)));
    };
    Ok(date
        .unwrap_or_else(|| Utc::now().date_naive())
        .clamp(start, end))
}
