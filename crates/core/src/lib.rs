//! Core business logic for Accrue.
//!
//! This crate contains pure leave-accounting logic with ZERO web or storage
//! dependencies. All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `policy` - Leave types and effective-dated policies
//! - `ledger` - Balance rows, reservations, accrual and rollover
//! - `blackout` - Blackout periods and conflict resolution
//! - `request` - Leave requests and working-day counting
//! - `workflow` - Approval chains and request status transitions
//! - `directory` - Read-only org hierarchy oracle
//! - `events` - Lifecycle events and the notification sink

pub mod blackout;
pub mod directory;
pub mod events;
pub mod ledger;
pub mod policy;
pub mod request;
pub mod workflow;
