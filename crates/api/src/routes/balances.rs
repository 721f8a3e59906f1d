//! Balance routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{AppState, error::ApiError, middleware::AuthUser};
use accrue_core::ledger::{BalanceKey, BalanceSnapshot, LedgerTransaction};
use accrue_shared::types::{LeaveTypeId, PageRequest, PageResponse, UserId};

/// Creates the balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/balances/{user_id}/{leave_type_id}/{year}", get(get_balance))
        .route(
            "/balances/{user_id}/{leave_type_id}/{year}/transactions",
            get(list_transactions),
        )
}

/// GET `/balances/{user_id}/{leave_type_id}/{year}` - Current state of a row.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, leave_type_id, year)): Path<(UserId, LeaveTypeId, i32)>,
) -> Result<Json<BalanceSnapshot>, ApiError> {
    auth.require_self_or_admin(user_id)?;
    let snapshot = state
        .balances
        .get_balance(BalanceKey::new(user_id, leave_type_id, year))
        .await?;
    Ok(Json(snapshot))
}

/// GET `/balances/{user_id}/{leave_type_id}/{year}/transactions` - Ledger
/// history in sequence order.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, leave_type_id, year)): Path<(UserId, LeaveTypeId, i32)>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<LedgerTransaction>>, ApiError> {
    auth.require_self_or_admin(user_id)?;
    let transactions = state
        .balances
        .list_transactions(BalanceKey::new(user_id, leave_type_id, year), page)
        .await?;
    Ok(Json(transactions))
}
