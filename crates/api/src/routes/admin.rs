//! Administration routes: catalog, blackouts, batch jobs and manual
//! balance corrections. Mounted behind `admin_middleware`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, error::ApiError, middleware::AuthUser};
use accrue_core::blackout::{Blackout, CreateBlackoutInput};
use accrue_core::ledger::{BalanceKey, LedgerTransaction};
use accrue_core::policy::{
    AssignPolicyInput, CreateLeaveTypeInput, LeaveType, Policy, UpdateLeaveTypeInput,
};
use accrue_core::workflow::Approval;
use accrue_db::repositories::AccrualRun;
use accrue_shared::types::{BlackoutId, LeaveTypeId, UserId};

/// Creates the admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/leave-types", get(list_leave_types).post(create_leave_type))
        .route("/leave-types/{leave_type_id}", patch(update_leave_type))
        .route("/policies", post(assign_policy))
        .route("/policies/{user_id}/{leave_type_id}", get(list_policies))
        .route("/blackouts", get(list_blackouts).post(create_blackout))
        .route("/blackouts/{blackout_id}", delete(deactivate_blackout))
        .route("/accruals/run", post(run_accrual))
        .route("/rollovers", post(run_rollover))
        .route("/balances/adjust", post(adjust_balance))
        .route("/balances/reset", post(reset_balance))
        .route("/reminders/run", post(run_reminders))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing blackouts.
#[derive(Debug, Deserialize)]
pub struct ListBlackoutsQuery {
    /// Only return active blackouts.
    #[serde(default)]
    pub active_only: bool,
}

/// Request body for an accrual run.
#[derive(Debug, Default, Deserialize)]
pub struct RunAccrualRequest {
    /// Accrue through this date (default: today).
    pub as_of: Option<NaiveDate>,
}

/// Request body for year-end rollover.
#[derive(Debug, Deserialize)]
pub struct RunRolloverRequest {
    /// Year being closed.
    pub year: i32,
    /// Restrict to one employee (requires `leave_type_id`).
    pub user_id: Option<UserId>,
    /// Restrict to one leave type (requires `user_id`).
    pub leave_type_id: Option<LeaveTypeId>,
}

/// Request body for a manual adjustment.
#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    /// Employee.
    pub user_id: UserId,
    /// Leave type.
    pub leave_type_id: LeaveTypeId,
    /// Balance year.
    pub year: i32,
    /// Signed days to add.
    pub amount: Decimal,
    /// Audit reason.
    pub reason: String,
    /// Effective date inside the year (default: today, clamped to the year).
    pub effective_date: Option<NaiveDate>,
}

/// Request body for a reset.
#[derive(Debug, Deserialize)]
pub struct ResetBalanceRequest {
    /// Employee.
    pub user_id: UserId,
    /// Leave type.
    pub leave_type_id: LeaveTypeId,
    /// Balance year.
    pub year: i32,
    /// Balance after the reset.
    pub target: Decimal,
    /// Audit reason.
    pub reason: String,
    /// Effective date inside the year.
    pub effective_date: Option<NaiveDate>,
}

/// Response for a reminder run.
#[derive(Debug, Serialize)]
pub struct RemindersResponse {
    /// Rows that were nudged.
    pub reminded: Vec<Approval>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/leave-types` - Every leave type ordered by code.
async fn list_leave_types(State(state): State<AppState>) -> Json<Vec<LeaveType>> {
    Json(state.policies.list_leave_types().await)
}

/// POST `/leave-types` - Create a leave type.
async fn create_leave_type(
    State(state): State<AppState>,
    Json(input): Json<CreateLeaveTypeInput>,
) -> Result<(StatusCode, Json<LeaveType>), ApiError> {
    let leave_type = state.policies.create_leave_type(input).await?;
    Ok((StatusCode::CREATED, Json(leave_type)))
}

/// PATCH `/leave-types/{leave_type_id}` - Change flags or deactivate.
async fn update_leave_type(
    State(state): State<AppState>,
    Path(leave_type_id): Path<LeaveTypeId>,
    Json(input): Json<UpdateLeaveTypeInput>,
) -> Result<Json<LeaveType>, ApiError> {
    let leave_type = state
        .policies
        .update_leave_type(leave_type_id, input)
        .await?;
    Ok(Json(leave_type))
}

/// POST `/policies` - Assign a policy, superseding the current one.
async fn assign_policy(
    State(state): State<AppState>,
    Json(input): Json<AssignPolicyInput>,
) -> Result<(StatusCode, Json<Policy>), ApiError> {
    let policy = state.policies.assign_policy(input).await?;
    Ok((StatusCode::CREATED, Json(policy)))
}

/// GET `/policies/{user_id}/{leave_type_id}` - Policy history.
async fn list_policies(
    State(state): State<AppState>,
    Path((user_id, leave_type_id)): Path<(UserId, LeaveTypeId)>,
) -> Json<Vec<Policy>> {
    Json(state.policies.policies_for(user_id, leave_type_id))
}

/// GET `/blackouts` - Blackouts ordered by creation.
async fn list_blackouts(
    State(state): State<AppState>,
    Query(query): Query<ListBlackoutsQuery>,
) -> Json<Vec<Blackout>> {
    Json(state.blackouts.list_blackouts(query.active_only))
}

/// POST `/blackouts` - Create a blackout.
async fn create_blackout(
    State(state): State<AppState>,
    Json(input): Json<CreateBlackoutInput>,
) -> Result<(StatusCode, Json<Blackout>), ApiError> {
    let blackout = state.blackouts.create_blackout(input)?;
    Ok((StatusCode::CREATED, Json(blackout)))
}

/// DELETE `/blackouts/{blackout_id}` - Deactivate a blackout.
async fn deactivate_blackout(
    State(state): State<AppState>,
    Path(blackout_id): Path<BlackoutId>,
) -> Result<Json<Blackout>, ApiError> {
    Ok(Json(state.blackouts.deactivate_blackout(blackout_id)?))
}

/// POST `/accruals/run` - Accrue every active policy through a date.
async fn run_accrual(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<RunAccrualRequest>>,
) -> Json<AccrualRun> {
    let as_of = body
        .and_then(|Json(b)| b.as_of)
        .unwrap_or_else(|| Utc::now().date_naive());
    let run = state.balances.run_accrual(as_of).await;
    info!(
        actor = %auth.user_id(),
        as_of = %as_of,
        accrued = run.outcomes.len(),
        failed = run.failures.len(),
        "accrual run requested"
    );
    Json(run)
}

/// POST `/rollovers` - Close a year for one row or for every row.
async fn run_rollover(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<RunRolloverRequest>,
) -> Result<Response, ApiError> {
    info!(actor = %auth.user_id(), year = body.year, "rollover requested");
    match (body.user_id, body.leave_type_id) {
        (Some(user_id), Some(leave_type_id)) => {
            let outcome = state
                .balances
                .rollover_year_end(user_id, leave_type_id, body.year)
                .await?;
            Ok(Json(outcome).into_response())
        }
        (None, None) => Ok(Json(state.balances.rollover_all(body.year).await).into_response()),
        _ => Err(ApiError::validation(
            "user_id and leave_type_id must be given together",
        )),
    }
}

/// POST `/balances/adjust` - Manual signed correction.
async fn adjust_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AdjustBalanceRequest>,
) -> Result<(StatusCode, Json<LedgerTransaction>), ApiError> {
    let key = BalanceKey::new(body.user_id, body.leave_type_id, body.year);
    let transaction = state
        .balances
        .adjust(key, body.amount, &body.reason, body.effective_date)
        .await?;
    info!(actor = %auth.user_id(), key = %key, "manual adjustment recorded");
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// POST `/balances/reset` - Set a balance to an exact value.
async fn reset_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ResetBalanceRequest>,
) -> Result<(StatusCode, Json<LedgerTransaction>), ApiError> {
    let key = BalanceKey::new(body.user_id, body.leave_type_id, body.year);
    let transaction = state
        .balances
        .reset(key, body.target, &body.reason, body.effective_date)
        .await?;
    info!(actor = %auth.user_id(), key = %key, "balance reset recorded");
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// POST `/reminders/run` - Emit reminders for stale approvals.
async fn run_reminders(State(state): State<AppState>) -> Json<RemindersResponse> {
    Json(RemindersResponse {
        reminded: state.workflow.due_reminders(Utc::now()).await,
    })
}
