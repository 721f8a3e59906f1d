//! Storage layer with concurrency-safe repositories.
//!
//! This crate provides:
//! - The in-process `Store` with one lock per balance row and per request
//! - Repository abstractions over the domain services of `accrue-core`
//! - The config-backed org directory and notification dispatchers
//! - The request lifecycle orchestrator (`WorkflowRepository`)

pub mod directory;
pub mod notify;
pub mod repositories;
pub mod store;

pub use directory::StaticOrgDirectory;
pub use notify::{ChannelDispatcher, RecordingDispatcher};
pub use repositories::{
    BalanceRepository, BlackoutRepository, PolicyRepository, WorkflowRepository,
};
pub use store::Store;
