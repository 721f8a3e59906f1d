//! Approval routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use accrue_core::workflow::{Approval, Decision};
use accrue_db::repositories::RequestView;
use accrue_shared::types::{ApprovalId, UserId};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/approvals/pending", get(pending_approvals))
        .route("/approvals/{approval_id}/resolve", post(resolve_approval))
}

/// Request body for acting on an approval row.
#[derive(Debug, Deserialize)]
pub struct ResolveApprovalRequest {
    /// "approve", "deny" or "delegate".
    pub decision: String,
    /// Target of a delegation.
    pub delegate_to: Option<UserId>,
    /// Optional comment stored on the row.
    pub comment: Option<String>,
}

impl ResolveApprovalRequest {
    fn decision(&self) -> Result<Decision, ApiError> {
        match (self.decision.to_lowercase().as_str(), self.delegate_to) {
            ("approve", _) => Ok(Decision::Approve),
            ("deny", _) => Ok(Decision::Deny),
            ("delegate", Some(delegate)) => Ok(Decision::Delegate(delegate)),
            ("delegate", None) => Err(ApiError::validation("delegate_to is required to delegate")),
            (other, _) => Err(ApiError::validation(format!("Unknown decision: {other}"))),
        }
    }
}

/// GET `/approvals/pending` - Rows the caller can act on now.
async fn pending_approvals(State(state): State<AppState>, auth: AuthUser) -> Json<Vec<Approval>> {
    Json(state.workflow.pending_approvals_for(auth.user_id()).await)
}

/// POST `/approvals/{approval_id}/resolve` - Approve, deny or delegate.
async fn resolve_approval(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(approval_id): Path<ApprovalId>,
    Json(body): Json<ResolveApprovalRequest>,
) -> Result<Json<RequestView>, ApiError> {
    let decision = body.decision()?;
    let view = state
        .workflow
        .resolve_approval(approval_id, auth.user_id(), decision, body.comment)
        .await?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn body(decision: &str, delegate_to: Option<UserId>) -> ResolveApprovalRequest {
        ResolveApprovalRequest {
            decision: decision.to_string(),
            delegate_to,
            comment: None,
        }
    }

    #[rstest]
    #[case("approve", Decision::Approve)]
    #[case("APPROVE", Decision::Approve)]
    #[case("deny", Decision::Deny)]
    fn test_plain_decisions(#[case] raw: &str, #[case] expected: Decision) {
        assert_eq!(body(raw, None).decision().unwrap(), expected);
    }

    #[test]
    fn test_delegate_needs_target() {
        assert!(body("delegate", None).decision().is_err());
        let target = UserId::new();
        assert_eq!(
            body("delegate", Some(target)).decision().unwrap(),
            Decision::Delegate(target)
        );
        assert!(body("escalate", None).decision().is_err());
    }
}
