//! Lifecycle events handed to the notification collaborator.

use serde::{Deserialize, Serialize};

use accrue_shared::types::{ApprovalId, RequestId, UserId};

/// Something that happened to a leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A request entered the workflow.
    RequestSubmitted {
        /// The request.
        request_id: RequestId,
        /// Its requester.
        user_id: UserId,
    },
    /// An approval row became actionable.
    ApprovalRequested {
        /// The request.
        request_id: RequestId,
        /// The row.
        approval_id: ApprovalId,
        /// Who must act.
        approver_id: UserId,
    },
    /// The request was approved and its days committed.
    RequestApproved {
        /// The request.
        request_id: RequestId,
        /// Its requester.
        user_id: UserId,
    },
    /// The request was denied and its hold released.
    RequestDenied {
        /// The request.
        request_id: RequestId,
        /// Its requester.
        user_id: UserId,
        /// The denying row.
        approval_id: ApprovalId,
    },
    /// An actionable row has waited past the reminder interval.
    ReminderDue {
        /// The request.
        request_id: RequestId,
        /// The waiting row.
        approval_id: ApprovalId,
        /// Who must act.
        approver_id: UserId,
    },
    /// The requester withdrew a pending request.
    RequestWithdrawn {
        /// The request.
        request_id: RequestId,
        /// Its requester.
        user_id: UserId,
    },
    /// A pending request was cancelled with a reason.
    RequestCancelled {
        /// The request.
        request_id: RequestId,
        /// Its requester.
        user_id: UserId,
        /// Who cancelled it.
        cancelled_by: UserId,
    },
}

impl LifecycleEvent {
    /// Returns the event name.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RequestSubmitted { .. } => "request_submitted",
            Self::ApprovalRequested { .. } => "approval_requested",
            Self::RequestApproved { .. } => "request_approved",
            Self::RequestDenied { .. } => "request_denied",
            Self::ReminderDue { .. } => "reminder_due",
            Self::RequestWithdrawn { .. } => "request_withdrawn",
            Self::RequestCancelled { .. } => "request_cancelled",
        }
    }

    /// Returns the request the event is about.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        match self {
            Self::RequestSubmitted { request_id, .. }
            | Self::ApprovalRequested { request_id, .. }
            | Self::RequestApproved { request_id, .. }
            | Self::RequestDenied { request_id, .. }
            | Self::ReminderDue { request_id, .. }
            | Self::RequestWithdrawn { request_id, .. }
            | Self::RequestCancelled { request_id, .. } => *request_id,
        }
    }
}

/// Fire-and-forget sink for lifecycle events.
///
/// Implementations must not block; delivery failures are theirs to log.
pub trait NotificationDispatcher: Send + Sync {
    /// Hands one event to the sink.
    fn dispatch(&self, event: LifecycleEvent);
}
