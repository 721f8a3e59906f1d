//! Accrue API Server
//!
//! Main entry point for the leave ledger and approval service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use accrue_api::{AppState, create_router};
use accrue_core::events::LifecycleEvent;
use accrue_db::repositories::WorkflowSettings;
use accrue_db::{ChannelDispatcher, StaticOrgDirectory, Store};
use accrue_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accrue=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .unwrap_or(i64::MAX),
        ..JwtConfig::default()
    });

    let directory = StaticOrgDirectory::new(config.directory.clone());
    info!(employees = directory.len(), "org directory loaded");

    let (dispatcher, events) = ChannelDispatcher::new();
    tokio::spawn(log_events(events));

    let state = AppState::new(
        Store::new(),
        Arc::new(directory),
        Arc::new(dispatcher),
        WorkflowSettings::from_config(&config.leave),
        Arc::new(jwt_service),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Drains lifecycle events. Delivery to mail or chat plugs in here.
async fn log_events(mut events: UnboundedReceiver<LifecycleEvent>) {
    while let Some(event) = events.recv().await {
        info!(
            kind = event.kind(),
            request_id = %event.request_id(),
            "lifecycle event"
        );
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
