//! In-process storage shared by every repository.
//!
//! Rows that are mutated as a unit sit behind their own `tokio::sync::Mutex`
//! inside a `DashMap`. A handle is cloned out of the map before it is locked
//! so no shard lock is ever held across an `.await`.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};

use accrue_core::blackout::Blackout;
use accrue_core::ledger::{BalanceKey, BalanceLedger};
use accrue_core::policy::{LeaveType, Policy};
use accrue_core::request::LeaveRequest;
use accrue_core::workflow::Approval;
use accrue_shared::types::{
    ApprovalId, BlackoutId, LeaveTypeId, RequestId, ReservationId, UserId,
};

/// A request with its approval rows, locked together.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// The request.
    pub request: LeaveRequest,
    /// Its approval chain.
    pub approvals: Vec<Approval>,
}

/// Shared handle to one balance row.
pub type BalanceHandle = Arc<Mutex<BalanceLedger>>;

/// Shared handle to one request.
pub type RequestHandle = Arc<Mutex<RequestRecord>>;

/// Every table of the service. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub(crate) leave_types: Arc<RwLock<Vec<LeaveType>>>,
    pub(crate) policies: Arc<DashMap<(UserId, LeaveTypeId), Vec<Policy>>>,
    pub(crate) balances: Arc<DashMap<BalanceKey, BalanceHandle>>,
    pub(crate) reservations: Arc<DashMap<ReservationId, BalanceKey>>,
    pub(crate) blackouts: Arc<DashMap<BlackoutId, Blackout>>,
    pub(crate) blackout_usage: Arc<DashMap<BlackoutId, BTreeSet<RequestId>>>,
    pub(crate) requests: Arc<DashMap<RequestId, RequestHandle>>,
    pub(crate) approvals: Arc<DashMap<ApprovalId, RequestId>>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to a balance row, if it exists.
    pub(crate) fn balance_handle(&self, key: &BalanceKey) -> Option<BalanceHandle> {
        self.balances.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Handle to a request, if it exists.
    pub(crate) fn request_handle(&self, id: &RequestId) -> Option<RequestHandle> {
        self.requests.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Handles to every stored request.
    pub(crate) fn request_handles(&self) -> Vec<RequestHandle> {
        self.requests
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
