//! Blackout repository: definitions and request usage counts.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use accrue_core::blackout::{
    Blackout, BlackoutError, BlackoutEvaluation, BlackoutResolver, CreateBlackoutInput,
    Restriction,
};
use accrue_core::directory::EmployeeProfile;
use accrue_shared::types::{BlackoutId, LeaveTypeId, RequestId};

use crate::store::Store;

/// Evaluation of a date range plus the snapshot stored on the request.
#[derive(Debug, Clone)]
pub struct BlackoutCheck {
    /// Conflicts and warnings.
    pub evaluation: BlackoutEvaluation,
    /// Serialized definitions of every matched blackout.
    pub snapshot: serde_json::Value,
}

/// Blackout repository.
#[derive(Debug, Clone)]
pub struct BlackoutRepository {
    store: Store,
}

impl BlackoutRepository {
    /// Creates a new blackout repository.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Creates a blackout.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed name, scope, schedule or
    /// restriction.
    pub fn create_blackout(&self, input: CreateBlackoutInput) -> Result<Blackout, BlackoutError> {
        BlackoutResolver::validate(&input)?;
        let blackout = BlackoutResolver::build(input, Utc::now());
        self.store.blackouts.insert(blackout.id, blackout.clone());

        info!(blackout_id = %blackout.id, name = %blackout.name, "blackout created");
        Ok(blackout)
    }

    /// Deactivates a blackout. Requests already evaluated keep their snapshot.
    ///
    /// # Errors
    ///
    /// Returns `BlackoutNotFound`.
    pub fn deactivate_blackout(&self, id: BlackoutId) -> Result<Blackout, BlackoutError> {
        let mut blackout = self
            .store
            .blackouts
            .get_mut(&id)
            .ok_or(BlackoutError::BlackoutNotFound(id))?;
        blackout.is_active = false;

        info!(blackout_id = %id, "blackout deactivated");
        Ok(blackout.clone())
    }

    /// Lists blackouts ordered by creation, optionally only active ones.
    pub fn list_blackouts(&self, active_only: bool) -> Vec<Blackout> {
        let mut blackouts: Vec<Blackout> = self
            .store
            .blackouts
            .iter()
            .filter(|b| !active_only || b.is_active)
            .map(|b| b.value().clone())
            .collect();
        blackouts.sort_by_key(|b| (b.created_at, b.id));
        blackouts
    }

    /// Evaluates a request's dates against every active blackout and claims
    /// a slot on each `limit_requests` blackout it still fits under.
    ///
    /// The count and the claim happen under the blackout's map entry, so two
    /// submissions can never both take the last slot; the loser sees a
    /// conflict. Claims are dropped with `release_usage` if the submission
    /// fails later.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if the matched definitions cannot be serialized.
    pub fn check(
        &self,
        request_id: RequestId,
        profile: &EmployeeProfile,
        leave_type_id: LeaveTypeId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BlackoutCheck, BlackoutError> {
        let blackouts = self.list_blackouts(true);
        let usage = self.usage_counts();
        let mut evaluation =
            BlackoutResolver::evaluate(&blackouts, profile, leave_type_id, start, end, &usage);

        let (admitted, lost): (Vec<_>, Vec<_>) = std::mem::take(&mut evaluation.warnings)
            .into_iter()
            .partition(|hit| match hit.restriction {
                Restriction::LimitRequests { max_requests } => {
                    self.claim_slot(hit.blackout_id, request_id, max_requests)
                }
                _ => true,
            });
        if !lost.is_empty() {
            debug!(request_id = %request_id, lost = lost.len(), "blackout slots taken concurrently");
        }
        evaluation.warnings = admitted;
        evaluation.conflicts.extend(lost);

        let snapshot = BlackoutResolver::snapshot(&blackouts, &evaluation)?;
        Ok(BlackoutCheck {
            evaluation,
            snapshot,
        })
    }

    fn claim_slot(&self, id: BlackoutId, request_id: RequestId, max_requests: u32) -> bool {
        let mut holders = self.store.blackout_usage.entry(id).or_default();
        let limit = usize::try_from(max_requests).unwrap_or(usize::MAX);
        if holders.contains(&request_id) || holders.len() < limit {
            holders.insert(request_id);
            true
        } else {
            false
        }
    }

    /// Pending and approved requests recorded against each blackout.
    pub fn usage_counts(&self) -> HashMap<BlackoutId, u32> {
        self.store
            .blackout_usage
            .iter()
            .map(|entry| {
                let count = u32::try_from(entry.value().len()).unwrap_or(u32::MAX);
                (*entry.key(), count)
            })
            .collect()
    }

    /// Counts a live request against the blackouts it matched.
    pub fn record_usage(&self, request_id: RequestId, blackout_ids: impl IntoIterator<Item = BlackoutId>) {
        for id in blackout_ids {
            self.store
                .blackout_usage
                .entry(id)
                .or_default()
                .insert(request_id);
        }
    }

    /// Stops counting a request that left the pending or approved states.
    pub fn release_usage(&self, request_id: RequestId, blackout_ids: impl IntoIterator<Item = BlackoutId>) {
        for id in blackout_ids {
            if let Some(mut requests) = self.store.blackout_usage.get_mut(&id) {
                requests.remove(&request_id);
            }
        }
    }
}
