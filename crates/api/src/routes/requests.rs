//! Leave request routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use accrue_core::request::{LeaveRequest, SubmitRequestInput};
use accrue_db::repositories::RequestView;
use accrue_shared::types::{PageRequest, PageResponse, RequestId};

/// Creates the request routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(submit_request).get(list_my_requests))
        .route("/requests/{request_id}", get(get_request))
        .route("/requests/{request_id}/withdraw", post(withdraw_request))
        .route("/requests/{request_id}/cancel", post(cancel_request))
}

/// Request body for cancelling a request.
#[derive(Debug, Deserialize)]
pub struct CancelRequestBody {
    /// Why the request is cancelled.
    pub reason: String,
}

/// POST `/requests` - Submit a leave request for the caller.
async fn submit_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<SubmitRequestInput>,
) -> Result<(StatusCode, Json<RequestView>), ApiError> {
    let view = state.workflow.submit_request(auth.user_id(), input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET `/requests` - The caller's requests, newest first.
async fn list_my_requests(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(page): Query<PageRequest>,
) -> Json<PageResponse<LeaveRequest>> {
    Json(state.workflow.list_requests_for(auth.user_id(), page).await)
}

/// GET `/requests/{request_id}` - A request with its approval rows.
///
/// Visible to the requester, anyone on the chain, and administrators.
async fn get_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<RequestId>,
) -> Result<Json<RequestView>, ApiError> {
    let view = state.workflow.get_request(request_id).await?;
    let on_chain = view.approvals.iter().any(|a| a.approver_id == auth.user_id());
    if !on_chain {
        auth.require_self_or_admin(view.request.user_id)?;
    }
    Ok(Json(view))
}

/// POST `/requests/{request_id}/withdraw` - Requester pulls a pending request.
async fn withdraw_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<RequestId>,
) -> Result<Json<RequestView>, ApiError> {
    let view = state
        .workflow
        .withdraw_request(request_id, auth.user_id())
        .await?;
    Ok(Json(view))
}

/// POST `/requests/{request_id}/cancel` - Requester or administrator closes a
/// pending request with a reason.
async fn cancel_request(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(request_id): Path<RequestId>,
    Json(body): Json<CancelRequestBody>,
) -> Result<Json<RequestView>, ApiError> {
    let current = state.workflow.get_request(request_id).await?;
    auth.require_self_or_admin(current.request.user_id)?;

    let view = state
        .workflow
        .cancel_request(request_id, auth.user_id(), &body.reason)
        .await?;
    info!(request_id = %request_id, actor = %auth.user_id(), role = %auth.role(), "cancel accepted");
    Ok(Json(view))
}
