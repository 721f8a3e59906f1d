//! Request lifecycle orchestrator.
//!
//! Submission runs blackout evaluation, the balance hold and chain routing
//! in that order, failing before any side effect it cannot undo. Approval
//! resolution is a compare-and-swap under the request lock; the balance
//! row is only ever locked while the request lock is held, never the other
//! way round.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use accrue_core::blackout::{BlackoutError, BlackoutHit};
use accrue_core::directory::{DirectoryError, OrgDirectory};
use accrue_core::events::{LifecycleEvent, NotificationDispatcher};
use accrue_core::ledger::LedgerError;
use accrue_core::policy::PolicyError;
use accrue_core::request::{
    LeaveRequest, RequestError, RequestStatus, SubmitRequestInput, count_days,
};
use accrue_core::workflow::{
    Approval, ApprovalChainBuilder, ApprovalMachine, ChainOutcome, Decision, WorkflowError,
    WorkflowService,
};
use accrue_shared::config::LeaveConfig;
use accrue_shared::types::{ApprovalId, BlackoutId, PageRequest, PageResponse, RequestId, UserId};

use super::balance::{BalanceError, BalanceRepository};
use super::blackout::BlackoutRepository;
use super::policy::PolicyRepository;
use crate::store::{RequestRecord, Store};

/// Errors raised by the request lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Malformed request input.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Leave type or policy problem.
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Balance rule violated or ledger corrupted.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Blackout evaluation failed.
    #[error(transparent)]
    Blackout(#[from] BlackoutError),

    /// Approval or status transition rejected.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Org directory lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The dates fall in a blocking blackout and no valid override applies.
    #[error("Request conflicts with {} blackout period(s)", conflicts.len())]
    BlackoutViolation {
        /// The blocking blackouts.
        conflicts: Vec<BlackoutHit>,
    },

    /// Request not found.
    #[error("Leave request {0} not found")]
    RequestNotFound(RequestId),
}

impl LifecycleError {
    /// Returns true for errors that indicate corrupted ledger state.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_fatal())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Request(e) => e.status_code(),
            Self::Policy(e) => e.status_code(),
            Self::Ledger(e) => e.status_code(),
            Self::Blackout(e) => e.status_code(),
            Self::Workflow(e) => e.status_code(),
            Self::Directory(e) => e.status_code(),
            Self::BlackoutViolation { .. } => 422,
            Self::RequestNotFound(_) => 404,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Request(e) => e.error_code(),
            Self::Policy(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Blackout(e) => e.error_code(),
            Self::Workflow(e) => e.error_code(),
            Self::Directory(e) => e.error_code(),
            Self::BlackoutViolation { .. } => "BLACKOUT_VIOLATION",
            Self::RequestNotFound(_) => "REQUEST_NOT_FOUND",
        }
    }
}

impl From<BalanceError> for LifecycleError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Ledger(e) => Self::Ledger(e),
            BalanceError::Policy(e) => Self::Policy(e),
            BalanceError::Directory(e) => Self::Directory(e),
        }
    }
}

/// A request together with its approval rows.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    /// The request.
    pub request: LeaveRequest,
    /// Its approval chain, in level then sequence order.
    pub approvals: Vec<Approval>,
}

impl From<RequestRecord> for RequestView {
    fn from(record: RequestRecord) -> Self {
        let mut approvals = record.approvals;
        approvals.sort_by_key(|a| (a.level, a.sequence, a.created_at));
        Self {
            request: record.request,
            approvals,
        }
    }
}

/// Lifecycle settings taken from the `leave` config section.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowSettings {
    /// Working hours in one leave day.
    pub hours_per_day: Decimal,
    /// Minimum time between two reminders for one approval.
    pub reminder_interval: TimeDelta,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&LeaveConfig::default())
    }
}

impl WorkflowSettings {
    /// Builds settings from configuration.
    #[must_use]
    pub fn from_config(leave: &LeaveConfig) -> Self {
        Self {
            hours_per_day: leave.hours_per_day,
            reminder_interval: TimeDelta::try_hours(leave.reminder_interval_hours)
                .unwrap_or(TimeDelta::MAX),
        }
    }
}

/// Request lifecycle orchestrator.
#[derive(Clone)]
pub struct WorkflowRepository {
    store: Store,
    policies: PolicyRepository,
    balances: BalanceRepository,
    blackouts: BlackoutRepository,
    directory: Arc<dyn OrgDirectory>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    settings: WorkflowSettings,
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub fn new(
        store: Store,
        directory: Arc<dyn OrgDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            policies: PolicyRepository::new(store.clone()),
            balances: BalanceRepository::new(store.clone(), Arc::clone(&directory)),
            blackouts: BlackoutRepository::new(store.clone()),
            store,
            directory,
            dispatcher,
            settings,
        }
    }

    /// Submits a leave request.
    ///
    /// An empty approval chain approves and commits the request at once.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The dates are invalid or cover no working time
    /// - The leave type is unknown or inactive
    /// - A blocking blackout matches without a signed-off override
    /// - No policy covers the start date, or the balance is insufficient
    /// - Nobody can approve the request, or the directory is unavailable
    pub async fn submit_request(
        &self,
        user_id: UserId,
        input: SubmitRequestInput,
    ) -> Result<RequestView, LifecycleError> {
        if let Some(emergency) = &input.emergency_override {
            emergency.validate()?;
        }
        let days = count_days(
            input.start_date,
            input.end_date,
            input.start_half,
            input.end_half,
            self.settings.hours_per_day,
        )?;
        let leave_type = self.policies.active_leave_type(input.leave_type_id).await?;
        let profile = self.directory.profile(user_id)?;

        let request_id = RequestId::new();
        let check = self.blackouts.check(
            request_id,
            &profile,
            leave_type.id,
            input.start_date,
            input.end_date,
        )?;
        let claimed: Vec<BlackoutId> = check.evaluation.matched_ids().collect();
        if check.evaluation.has_conflicts() {
            let overridden = input
                .emergency_override
                .as_ref()
                .is_some_and(|o| o.is_signed_off(user_id))
                && check.evaluation.all_conflicts_overridable();
            if !overridden {
                self.blackouts.release_usage(request_id, claimed);
                info!(
                    user_id = %user_id,
                    conflicts = check.evaluation.conflicts.len(),
                    "submission blocked by blackout"
                );
                return Err(LifecycleError::BlackoutViolation {
                    conflicts: check.evaluation.conflicts,
                });
            }
            warn!(user_id = %user_id, "blackout conflicts bypassed by emergency override");
        }

        let now = Utc::now();
        let mut request = LeaveRequest::pending(
            request_id,
            user_id,
            input,
            days.total_days,
            days.total_hours,
            check.evaluation,
            check.snapshot,
            now,
        );

        if leave_type.uses_balance {
            let reservation = match self
                .balances
                .reserve(
                    user_id,
                    &leave_type,
                    request.start_date,
                    request.total_days,
                    Some(request.id),
                )
                .await
            {
                Ok(reservation) => reservation,
                Err(err) => {
                    self.blackouts.release_usage(request_id, claimed);
                    return Err(err.into());
                }
            };
            request.reservation_id = Some(reservation.id);
            request.balance_year = Some(reservation.key.year);
        }

        let approvals = match ApprovalChainBuilder::build(
            request.id,
            user_id,
            &leave_type,
            request.total_days,
            self.directory.as_ref(),
            now.date_naive(),
            now,
        ) {
            Ok(rows) => rows,
            Err(err) => {
                self.abort_submission(&request).await;
                return Err(err.into());
            }
        };

        if approvals.is_empty() {
            request.status = WorkflowService::approve(request.status)?;
            if let Some(reservation_id) = request.reservation_id {
                match self.balances.commit(reservation_id, request.start_date).await {
                    Ok(outcome) => request.usage_transaction_id = Some(outcome.transaction_id),
                    Err(err) => {
                        self.abort_submission(&request).await;
                        return Err(err.into());
                    }
                }
            }
            request.decided_at = Some(now);
        }

        let record = RequestRecord { request, approvals };
        self.store
            .requests
            .insert(request_id, Arc::new(Mutex::new(record.clone())));
        for row in &record.approvals {
            self.store.approvals.insert(row.id, request_id);
        }
        self.blackouts
            .record_usage(request_id, matched_blackouts(&record.request));

        self.dispatcher.dispatch(LifecycleEvent::RequestSubmitted {
            request_id,
            user_id,
        });
        if record.request.status == RequestStatus::Approved {
            self.dispatcher.dispatch(LifecycleEvent::RequestApproved {
                request_id,
                user_id,
            });
        } else {
            for row in ApprovalMachine::actionable(&record.approvals) {
                self.dispatcher.dispatch(LifecycleEvent::ApprovalRequested {
                    request_id,
                    approval_id: row.id,
                    approver_id: row.approver_id,
                });
            }
        }

        info!(
            request_id = %request_id,
            user_id = %user_id,
            total_days = %record.request.total_days,
            approvers = record.approvals.len(),
            status = %record.request.status,
            "leave request submitted"
        );
        Ok(record.into())
    }

    /// Applies one approver's decision.
    ///
    /// The final approval commits the hold and a denial releases it, each
    /// exactly once; a repeated decision fails with `AlreadyResolved`.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalNotFound`, `AlreadyResolved`, `NotAuthorizedToApprove`,
    /// `NotYourTurn`, `InvalidDelegation`, or a ledger error from the
    /// commit or release.
    pub async fn resolve_approval(
        &self,
        approval_id: ApprovalId,
        actor: UserId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<RequestView, LifecycleError> {
        let request_id = self
            .store
            .approvals
            .get(&approval_id)
            .map(|entry| *entry.value())
            .ok_or(WorkflowError::ApprovalNotFound(approval_id))?;
        let handle = self
            .store
            .request_handle(&request_id)
            .ok_or(LifecycleError::RequestNotFound(request_id))?;
        let mut record = handle.lock().await;

        let now = Utc::now();
        let requester = record.request.user_id;
        let mut approvals = record.approvals.clone();
        let resolution = ApprovalMachine::resolve(
            &mut approvals,
            approval_id,
            actor,
            requester,
            decision,
            comment,
            now,
        )?;

        let mut request = record.request.clone();
        let mut events = Vec::new();
        match resolution.outcome {
            ChainOutcome::Approved => {
                request.status = WorkflowService::approve(request.status)?;
                if let Some(reservation_id) = request.reservation_id {
                    let outcome = self.balances.commit(reservation_id, request.start_date).await?;
                    request.usage_transaction_id = Some(outcome.transaction_id);
                }
                request.decided_at = Some(now);
                request.closed_by = Some(actor);
                events.push(LifecycleEvent::RequestApproved {
                    request_id,
                    user_id: requester,
                });
            }
            ChainOutcome::Denied => {
                request.status = WorkflowService::deny(request.status)?;
                if let Some(reservation_id) = request.reservation_id {
                    self.balances.release(reservation_id).await?;
                }
                request.decided_at = Some(now);
                request.closed_by = Some(actor);
                self.blackouts
                    .release_usage(request_id, matched_blackouts(&request));
                events.push(LifecycleEvent::RequestDenied {
                    request_id,
                    user_id: requester,
                    approval_id,
                });
            }
            ChainOutcome::Pending => {
                events.extend(resolution.newly_actionable.iter().map(|row| {
                    LifecycleEvent::ApprovalRequested {
                        request_id,
                        approval_id: row.id,
                        approver_id: row.approver_id,
                    }
                }));
            }
        }

        for row in &approvals {
            if !self.store.approvals.contains_key(&row.id) {
                self.store.approvals.insert(row.id, request_id);
            }
        }
        record.request = request;
        record.approvals = approvals;
        let view = RequestView::from((*record).clone());
        drop(record);

        info!(
            request_id = %request_id,
            approval_id = %approval_id,
            actor = %actor,
            decision = ?decision,
            status = %view.request.status,
            "approval resolved"
        );
        for event in events {
            self.dispatcher.dispatch(event);
        }
        Ok(view)
    }

    /// Withdraws a pending request on behalf of its requester.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound`, `NotRequester` or `InvalidTransition`.
    pub async fn withdraw_request(
        &self,
        request_id: RequestId,
        actor: UserId,
    ) -> Result<RequestView, LifecycleError> {
        let handle = self
            .store
            .request_handle(&request_id)
            .ok_or(LifecycleError::RequestNotFound(request_id))?;
        let mut record = handle.lock().await;
        let status =
            WorkflowService::withdraw(record.request.status, record.request.user_id, actor)?;
        self.close_pending(&mut record, status, actor, None).await?;
        let view = RequestView::from((*record).clone());
        drop(record);

        info!(request_id = %request_id, "leave request withdrawn");
        self.dispatcher.dispatch(LifecycleEvent::RequestWithdrawn {
            request_id,
            user_id: view.request.user_id,
        });
        Ok(view)
    }

    /// Cancels a pending request with a reason.
    ///
    /// Who may cancel is decided by the caller.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound`, `CancellationReasonRequired` or
    /// `InvalidTransition`.
    pub async fn cancel_request(
        &self,
        request_id: RequestId,
        actor: UserId,
        reason: &str,
    ) -> Result<RequestView, LifecycleError> {
        let handle = self
            .store
            .request_handle(&request_id)
            .ok_or(LifecycleError::RequestNotFound(request_id))?;
        let mut record = handle.lock().await;
        let status = WorkflowService::cancel(record.request.status, reason)?;
        self.close_pending(&mut record, status, actor, Some(reason.trim().to_string()))
            .await?;
        let view = RequestView::from((*record).clone());
        drop(record);

        info!(request_id = %request_id, cancelled_by = %actor, "leave request cancelled");
        self.dispatcher.dispatch(LifecycleEvent::RequestCancelled {
            request_id,
            user_id: view.request.user_id,
            cancelled_by: actor,
        });
        Ok(view)
    }

    /// Fetches a request with its approval rows.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound`.
    pub async fn get_request(&self, request_id: RequestId) -> Result<RequestView, LifecycleError> {
        let handle = self
            .store
            .request_handle(&request_id)
            .ok_or(LifecycleError::RequestNotFound(request_id))?;
        let record = handle.lock().await;
        Ok(RequestView::from((*record).clone()))
    }

    /// A page of a user's requests, newest first.
    pub async fn list_requests_for(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> PageResponse<LeaveRequest> {
        let mut requests = Vec::new();
        for handle in self.store.request_handles() {
            let record = handle.lock().await;
            if record.request.user_id == user_id {
                requests.push(record.request.clone());
            }
        }
        requests.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        let page = PageRequest::new(page.page, page.per_page);
        let total = u64::try_from(requests.len()).unwrap_or(u64::MAX);
        PageResponse::new(page.slice(&requests), page.page, page.per_page, total)
    }

    /// Rows the approver can act on right now.
    pub async fn pending_approvals_for(&self, approver_id: UserId) -> Vec<Approval> {
        let mut rows = Vec::new();
        for handle in self.store.request_handles() {
            let record = handle.lock().await;
            if record.request.status != RequestStatus::Pending {
                continue;
            }
            rows.extend(
                ApprovalMachine::actionable(&record.approvals)
                    .into_iter()
                    .filter(|a| a.approver_id == approver_id)
                    .cloned(),
            );
        }
        rows.sort_by_key(|a| a.created_at);
        rows
    }

    /// Marks and announces actionable rows that waited past the interval.
    pub async fn due_reminders(&self, now: DateTime<Utc>) -> Vec<Approval> {
        let mut due = Vec::new();
        for handle in self.store.request_handles() {
            let mut record = handle.lock().await;
            if record.request.status != RequestStatus::Pending {
                continue;
            }
            due.extend(ApprovalMachine::due_reminders(
                &mut record.approvals,
                now,
                self.settings.reminder_interval,
            ));
        }

        for row in &due {
            self.dispatcher.dispatch(LifecycleEvent::ReminderDue {
                request_id: row.request_id,
                approval_id: row.id,
                approver_id: row.approver_id,
            });
        }
        info!(count = due.len(), "reminders sent");
        due
    }

    async fn close_pending(
        &self,
        record: &mut RequestRecord,
        status: RequestStatus,
        actor: UserId,
        reason: Option<String>,
    ) -> Result<(), LifecycleError> {
        if let Some(reservation_id) = record.request.reservation_id {
            self.balances.release(reservation_id).await?;
        }
        let now = Utc::now();
        ApprovalMachine::cancel_pending(&mut record.approvals, now);
        record.request.status = status;
        record.request.decided_at = Some(now);
        record.request.closed_by = Some(actor);
        record.request.cancellation_reason = reason;
        self.blackouts
            .release_usage(record.request.id, matched_blackouts(&record.request));
        Ok(())
    }

    async fn abort_submission(&self, request: &LeaveRequest) {
        self.blackouts
            .release_usage(request.id, matched_blackouts(request));
        self.release_hold(request).await;
    }

    async fn release_hold(&self, request: &LeaveRequest) {
        let Some(reservation_id) = request.reservation_id else {
            return;
        };
        if let Err(err) = self.balances.release(reservation_id).await {
            error!(
                request_id = %request.id,
                reservation_id = %reservation_id,
                error = %err,
                "failed to release hold of an aborted submission"
            );
        }
    }
}

fn matched_blackouts(request: &LeaveRequest) -> Vec<BlackoutId> {
    request
        .blackout_conflicts
        .iter()
        .chain(&request.blackout_warnings)
        .map(|hit| hit.blackout_id)
        .collect()
}
