//! API route definitions.

use axum::{Router, middleware};

use crate::{
    AppState,
    middleware::{admin_middleware, auth_middleware},
};

pub mod admin;
pub mod approvals;
pub mod balances;
pub mod health;
pub mod requests;


/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // The last layer added runs first: authenticate, then check the role
    let admin_routes = Router::new()
        .merge(admin::routes())
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let protected_routes = Router::new()
        .merge(requests::routes())
        .merge(approvals::routes())
        .merge(balances::routes())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
        .merge(admin_routes)
}
