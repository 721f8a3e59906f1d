//! Leave request types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use accrue_shared::types::{LeaveTypeId, RequestId, ReservationId, TransactionId, UserId};

use crate::blackout::{BlackoutEvaluation, BlackoutHit};
use crate::request::error::RequestError;

/// Status of a leave request.
///
/// ```text
/// pending -> approved | denied | cancelled | withdrawn
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting on approvers.
    Pending,
    /// Approved; days committed.
    Approved,
    /// Denied; hold released.
    Denied,
    /// Cancelled with a reason.
    Cancelled,
    /// Withdrawn by the requester.
    Withdrawn,
}

impl RequestStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Cancelled => "cancelled",
            Self::Withdrawn => "withdrawn",
        }
    }

    /// Every status except `Pending` is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Pending and approved requests count against blackout request limits.
    #[must_use]
    pub const fn counts_toward_limits(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emergency override carried by a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyOverride {
    /// Why the blackout should be bypassed.
    pub reason: String,
    /// Who signed the override off.
    #[serde(default)]
    pub approved_by: Option<UserId>,
    /// When it was signed off.
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

impl EmergencyOverride {
    /// Checks that a reason is present.
    ///
    /// # Errors
    ///
    /// Returns `OverrideReasonRequired` for a blank reason.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.reason.trim().is_empty() {
            return Err(RequestError::OverrideReasonRequired);
        }
        Ok(())
    }

    /// True when someone other than the requester signed the override off.
    #[must_use]
    pub fn is_signed_off(&self, requester: UserId) -> bool {
        self.approved_by.is_some_and(|by| by != requester)
    }
}

/// Input for submitting a leave request.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequestInput {
    /// Requested leave type.
    pub leave_type_id: LeaveTypeId,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Take only the second half of the first day.
    #[serde(default)]
    pub start_half: bool,
    /// Take only the first half of the last day.
    #[serde(default)]
    pub end_half: bool,
    /// Free-text reason.
    #[serde(default)]
    pub reason: Option<String>,
    /// Emergency override of blackout conflicts.
    #[serde(default)]
    pub emergency_override: Option<EmergencyOverride>,
}

/// A leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Unique identifier.
    pub id: RequestId,
    /// The requester.
    pub user_id: UserId,
    /// Requested leave type.
    pub leave_type_id: LeaveTypeId,
    /// First day of leave.
    pub start_date: NaiveDate,
    /// Last day of leave.
    pub end_date: NaiveDate,
    /// Half-day start flag.
    pub start_half: bool,
    /// Half-day end flag.
    pub end_half: bool,
    /// Working days requested.
    pub total_days: Decimal,
    /// Working hours requested.
    pub total_hours: Decimal,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Current status.
    pub status: RequestStatus,
    /// Balance hold, for types that track balances.
    pub reservation_id: Option<ReservationId>,
    /// Year of the balance row charged.
    pub balance_year: Option<i32>,
    /// Blocking blackout hits recorded at submission.
    pub blackout_conflicts: Vec<BlackoutHit>,
    /// Informational blackout hits recorded at submission.
    pub blackout_warnings: Vec<BlackoutHit>,
    /// Definitions of the matched blackouts at submission.
    pub blackout_snapshot: serde_json::Value,
    /// Whether the request bypassed blackouts by emergency override.
    pub is_emergency_override: bool,
    /// Override reason.
    pub override_reason: Option<String>,
    /// Override sign-off.
    pub override_approved_by: Option<UserId>,
    /// Override sign-off time.
    pub override_approved_at: Option<DateTime<Utc>>,
    /// Usage entry written on approval.
    pub usage_transaction_id: Option<TransactionId>,
    /// Reason given on cancellation.
    pub cancellation_reason: Option<String>,
    /// Who cancelled or withdrew the request.
    pub closed_by: Option<UserId>,
    /// When the request was submitted.
    pub submitted_at: DateTime<Utc>,
    /// When the request reached a terminal status.
    pub decided_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    /// Creates a pending request and records its blackout evaluation.
    #[must_use]
    pub fn pending(
        id: RequestId,
        user_id: UserId,
        input: SubmitRequestInput,
        total_days: Decimal,
        total_hours: Decimal,
        evaluation: BlackoutEvaluation,
        blackout_snapshot: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        let emergency = input.emergency_override;
        Self {
            id,
            user_id,
            leave_type_id: input.leave_type_id,
            start_date: input.start_date,
            end_date: input.end_date,
            start_half: input.start_half,
            end_half: input.end_half,
            total_days,
            total_hours,
            reason: input.reason,
            status: RequestStatus::Pending,
            reservation_id: None,
            balance_year: None,
            blackout_conflicts: evaluation.conflicts,
            blackout_warnings: evaluation.warnings,
            blackout_snapshot,
            is_emergency_override: emergency.is_some(),
            override_reason: emergency.as_ref().map(|o| o.reason.clone()),
            override_approved_by: emergency.as_ref().and_then(|o| o.approved_by),
            override_approved_at: emergency.and_then(|o| o.approved_at),
            usage_transaction_id: None,
            cancellation_reason: None,
            closed_by: None,
            submitted_at: now,
            decided_at: None,
        }
    }
}
