//! Approval row state machine.
//!
//! All functions operate on the full row set of one request. Callers hold
//! the request's lock while they run, so the `pending` check on a row acts
//! as the compare-and-swap.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use accrue_shared::types::{ApprovalId, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Approval, ApprovalStatus, ChainOutcome, Decision, Resolution};

/// Longest chain of delegations from one original row.
pub const MAX_DELEGATION_DEPTH: usize = 8;

/// Stateless approval state machine.
pub struct ApprovalMachine;

impl ApprovalMachine {
    /// Lowest level that still has pending required rows.
    #[must_use]
    pub fn active_level(approvals: &[Approval]) -> Option<u32> {
        approvals
            .iter()
            .filter(|a| a.is_required && a.is_pending())
            .map(|a| a.level)
            .min()
    }

    /// Rows that may act right now.
    ///
    /// Inside the active level a parallel row may always act; a sequential
    /// row waits for every pending row of the level with a lower sequence.
    #[must_use]
    pub fn actionable(approvals: &[Approval]) -> Vec<&Approval> {
        let Some(level) = Self::active_level(approvals) else {
            return Vec::new();
        };
        let pending_at_level: Vec<&Approval> = approvals
            .iter()
            .filter(|a| a.level == level && a.is_pending())
            .collect();
        pending_at_level
            .iter()
            .filter(|row| {
                row.is_parallel
                    || !pending_at_level
                        .iter()
                        .any(|other| other.id != row.id && other.sequence < row.sequence)
            })
            .copied()
            .collect()
    }

    /// Overall state of the chain.
    ///
    /// Delegated and cancelled rows do not count; the delegate's row stands
    /// in for a delegated one.
    #[must_use]
    pub fn outcome(approvals: &[Approval]) -> ChainOutcome {
        let required = approvals.iter().filter(|a| {
            a.is_required && !matches!(a.status, ApprovalStatus::Delegated | ApprovalStatus::Cancelled)
        });
        let mut all_approved = true;
        for row in required {
            match row.status {
                ApprovalStatus::Denied => return ChainOutcome::Denied,
                ApprovalStatus::Approved => {}
                _ => all_approved = false,
            }
        }
        if all_approved {
            ChainOutcome::Approved
        } else {
            ChainOutcome::Pending
        }
    }

    /// Resolves one row for `actor`.
    ///
    /// On a final outcome every still-pending row is cancelled. Otherwise
    /// rows that just became actionable are stamped and returned.
    ///
    /// # Errors
    ///
    /// - `ApprovalNotFound` if the row is not in the chain
    /// - `AlreadyResolved` if the row left `pending`
    /// - `NotAuthorizedToApprove` if `actor` is not the row's approver
    /// - `NotYourTurn` if the row is not actionable yet
    /// - `InvalidDelegation` for a disallowed delegate or depth
    pub fn resolve(
        approvals: &mut Vec<Approval>,
        approval_id: ApprovalId,
        actor: UserId,
        requester: UserId,
        decision: Decision,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Resolution, WorkflowError> {
        let index = approvals
            .iter()
            .position(|a| a.id == approval_id)
            .ok_or(WorkflowError::ApprovalNotFound(approval_id))?;
        let row = &approvals[index];

        if !row.is_pending() {
            return Err(WorkflowError::AlreadyResolved(approval_id));
        }
        if row.approver_id != actor {
            return Err(WorkflowError::NotAuthorizedToApprove { user_id: actor });
        }
        if !Self::actionable(approvals).iter().any(|a| a.id == approval_id) {
            return Err(WorkflowError::NotYourTurn(approval_id));
        }

        let before: HashSet<ApprovalId> =
            Self::actionable(approvals).iter().map(|a| a.id).collect();

        let delegate_row = match decision {
            Decision::Approve => {
                Self::close_row(&mut approvals[index], ApprovalStatus::Approved, comment, now);
                None
            }
            Decision::Deny => {
                Self::close_row(&mut approvals[index], ApprovalStatus::Denied, comment, now);
                None
            }
            Decision::Delegate(delegate) => {
                Self::validate_delegation(approvals, index, delegate, requester)?;
                let original = &mut approvals[index];
                original.delegated_to = Some(delegate);
                Self::close_row(original, ApprovalStatus::Delegated, comment, now);

                let mut replacement = Approval::pending(
                    original.request_id,
                    delegate,
                    original.level,
                    original.sequence,
                    original.is_parallel,
                    now,
                );
                replacement.is_required = original.is_required;
                replacement.delegated_from = Some(original.id);
                Some(replacement)
            }
        };
        if let Some(row) = delegate_row {
            approvals.push(row);
        }

        let resolved = approvals[index].clone();
        let outcome = Self::outcome(approvals);
        let newly_actionable = match outcome {
            ChainOutcome::Pending => {
                let ids: Vec<ApprovalId> = Self::actionable(approvals)
                    .iter()
                    .map(|a| a.id)
                    .filter(|id| !before.contains(id))
                    .collect();
                let mut activated = Vec::with_capacity(ids.len());
                for row in approvals.iter_mut().filter(|a| ids.contains(&a.id)) {
                    row.activated_at = Some(now);
                    activated.push(row.clone());
                }
                activated
            }
            ChainOutcome::Approved | ChainOutcome::Denied => {
                Self::cancel_pending(approvals, now);
                Vec::new()
            }
        };

        Ok(Resolution {
            resolved,
            outcome,
            newly_actionable,
        })
    }

    /// Cancels every pending row, returning how many changed.
    pub fn cancel_pending(approvals: &mut [Approval], now: DateTime<Utc>) -> usize {
        let mut cancelled = 0;
        for row in approvals.iter_mut().filter(|a| a.is_pending()) {
            row.status = ApprovalStatus::Cancelled;
            row.decided_at = Some(now);
            cancelled += 1;
        }
        cancelled
    }

    /// Actionable rows whose last nudge is at least `interval` old.
    ///
    /// The clock starts when the row became actionable; returned rows are
    /// stamped with `now` so each is reminded at most once per interval.
    pub fn due_reminders(
        approvals: &mut [Approval],
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Vec<Approval> {
        let ids: Vec<ApprovalId> = Self::actionable(approvals).iter().map(|a| a.id).collect();
        let mut due = Vec::new();
        for row in approvals.iter_mut().filter(|a| ids.contains(&a.id)) {
            let since = row
                .reminder_sent_at
                .or(row.activated_at)
                .unwrap_or(row.created_at);
            if now - since >= interval {
                row.reminder_sent_at = Some(now);
                due.push(row.clone());
            }
        }
        due
    }

    /// Number of delegation hops that led to the row.
    #[must_use]
    pub fn delegation_depth(approvals: &[Approval], approval_id: ApprovalId) -> usize {
        let mut depth = 0;
        let mut current = approvals.iter().find(|a| a.id == approval_id);
        while let Some(from) = current.and_then(|a| a.delegated_from) {
            depth += 1;
            if depth > approvals.len() {
                break;
            }
            current = approvals.iter().find(|a| a.id == from);
        }
        depth
    }

    fn validate_delegation(
        approvals: &[Approval],
        index: usize,
        delegate: UserId,
        requester: UserId,
    ) -> Result<(), WorkflowError> {
        let row = &approvals[index];
        if delegate == row.approver_id {
            return Err(WorkflowError::InvalidDelegation(
                "cannot delegate to yourself".to_string(),
            ));
        }
        if delegate == requester {
            return Err(WorkflowError::InvalidDelegation(
                "cannot delegate to the requester".to_string(),
            ));
        }
        if approvals
            .iter()
            .any(|a| a.level == row.level && a.approver_id == delegate)
        {
            return Err(WorkflowError::InvalidDelegation(format!(
                "{delegate} is already an approver on level {}",
                row.level
            )));
        }
        if Self::delegation_depth(approvals, row.id) >= MAX_DELEGATION_DEPTH {
            return Err(WorkflowError::InvalidDelegation(format!(
                "delegation chain longer than {MAX_DELEGATION_DEPTH}"
            )));
        }
        Ok(())
    }

    fn close_row(
        row: &mut Approval,
        status: ApprovalStatus,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) {
        row.status = status;
        row.comment = comment;
        row.decided_at = Some(now);
    }
}
