//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for requests, approvals, balances and administration
//! - Authentication and admin-only middleware
//! - Error responses built from the domain error codes

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use accrue_core::directory::OrgDirectory;
use accrue_core::events::NotificationDispatcher;
use accrue_db::repositories::WorkflowSettings;
use accrue_db::{BalanceRepository, BlackoutRepository, PolicyRepository, Store, WorkflowRepository};
use accrue_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// JWT service for token verification.
    pub jwt_service: Arc<JwtService>,
    /// Leave types and policies.
    pub policies: PolicyRepository,
    /// Balance rows, accrual and rollover.
    pub balances: BalanceRepository,
    /// Blackout definitions.
    pub blackouts: BlackoutRepository,
    /// Request lifecycle.
    pub workflow: WorkflowRepository,
}

impl AppState {
    /// Wires every repository over one store.
    #[must_use]
    pub fn new(
        store: Store,
        directory: Arc<dyn OrgDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        settings: WorkflowSettings,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            jwt_service,
            policies: PolicyRepository::new(store.clone()),
            balances: BalanceRepository::new(store.clone(), Arc::clone(&directory)),
            blackouts: BlackoutRepository::new(store.clone()),
            workflow: WorkflowRepository::new(store, directory, dispatcher, settings),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
