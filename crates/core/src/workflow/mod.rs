//! Leave request approval workflow.
//!
//! This module implements the request lifecycle state machine, approval
//! chain routing, and the approval row state machine.
//!
//! # Modules
//!
//! - `types` - Approval rows, decisions and chain outcomes
//! - `error` - Workflow-specific error types
//! - `chain` - Approval chain construction
//! - `approval` - Approval row resolution, delegation and reminders
//! - `service` - Request status transitions

pub mod approval;
pub mod chain;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod approval_props;
#[cfg(test)]
mod service_props;

pub use approval::{ApprovalMachine, MAX_DELEGATION_DEPTH};
pub use chain::ApprovalChainBuilder;
pub use error::WorkflowError;
pub use service::WorkflowService;
pub use types::{Approval, ApprovalStatus, ChainOutcome, Decision, Resolution};
