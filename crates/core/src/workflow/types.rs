//! Approval workflow domain types.
//!
//! An approval chain is a set of rows grouped by level. Only the lowest
//! level that still has pending required rows is active.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use accrue_shared::types::{ApprovalId, RequestId, UserId};

/// Status of one approval row.
///
/// Rows leave `Pending` exactly once:
/// - Pending → Approved | Denied (resolve)
/// - Pending → Delegated (delegate; a new pending row replaces it)
/// - Pending → Cancelled (request closed before the row acted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting on the approver.
    Pending,
    /// Approved by the approver.
    Approved,
    /// Denied by the approver.
    Denied,
    /// Handed to another approver.
    Delegated,
    /// Closed without a decision.
    Cancelled,
}

impl ApprovalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Delegated => "delegated",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            "delegated" => Some(Self::Delegated),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One approver's slot in a request's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// Unique identifier.
    pub id: ApprovalId,
    /// The request being approved.
    pub request_id: RequestId,
    /// Who must act.
    pub approver_id: UserId,
    /// 1-based level.
    pub level: u32,
    /// Order inside the level for sequential rows.
    pub sequence: u32,
    /// Whether the outcome depends on this row.
    pub is_required: bool,
    /// Whether the row may act regardless of sequence.
    pub is_parallel: bool,
    /// Current status.
    pub status: ApprovalStatus,
    /// Delegate, once delegated.
    pub delegated_to: Option<UserId>,
    /// Row this one was delegated from.
    pub delegated_from: Option<ApprovalId>,
    /// Approver's comment.
    pub comment: Option<String>,
    /// When the row was resolved.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the row became actionable.
    pub activated_at: Option<DateTime<Utc>>,
    /// Last reminder sent.
    pub reminder_sent_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Approval {
    /// Creates a pending row.
    #[must_use]
    pub fn pending(
        request_id: RequestId,
        approver_id: UserId,
        level: u32,
        sequence: u32,
        is_parallel: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApprovalId::new(),
            request_id,
            approver_id,
            level,
            sequence,
            is_required: true,
            is_parallel,
            status: ApprovalStatus::Pending,
            delegated_to: None,
            delegated_from: None,
            comment: None,
            decided_at: None,
            activated_at: None,
            reminder_sent_at: None,
            created_at: now,
        }
    }

    /// True while the row waits on its approver.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

/// What an approver does with a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "delegate_to", rename_all = "lowercase")]
pub enum Decision {
    /// Approve the row.
    Approve,
    /// Deny the row, and with it the request.
    Deny,
    /// Hand the row to another approver.
    Delegate(UserId),
}

/// State of the whole chain after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainOutcome {
    /// More decisions are needed.
    Pending,
    /// Every required row approved.
    Approved,
    /// A required row denied.
    Denied,
}

/// Result of resolving one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The row as resolved.
    pub resolved: Approval,
    /// State of the chain afterwards.
    pub outcome: ChainOutcome,
    /// Rows that became actionable (including a delegate's new row).
    pub newly_actionable: Vec<Approval>,
}
