//! Policy repository for leave types and per-user policies.

use chrono::{Datelike, NaiveDate, Utc};
use tracing::info;

use accrue_core::policy::{
    AssignPolicyInput, CreateLeaveTypeInput, LeaveType, Policy, PolicyCatalog, PolicyError,
    UpdateLeaveTypeInput,
};
use accrue_shared::types::{LeaveTypeId, UserId};

use crate::store::Store;

/// Policy repository.
#[derive(Debug, Clone)]
pub struct PolicyRepository {
    store: Store,
}

impl PolicyRepository {
    /// Creates a new policy repository.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Creates a leave type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLeaveType` or `DuplicateCode`.
    pub async fn create_leave_type(
        &self,
        input: CreateLeaveTypeInput,
    ) -> Result<LeaveType, PolicyError> {
        let mut types = self.store.leave_types.write().await;
        PolicyCatalog::validate_leave_type(&input, &types)?;
        let leave_type = PolicyCatalog::build_leave_type(input, Utc::now());
        types.push(leave_type.clone());

        info!(leave_type_id = %leave_type.id, code = %leave_type.code, "leave type created");
        Ok(leave_type)
    }

    /// Changes the approval flags or active flag of a leave type.
    ///
    /// # Errors
    ///
    /// Returns `LeaveTypeNotFound`.
    pub async fn update_leave_type(
        &self,
        id: LeaveTypeId,
        input: UpdateLeaveTypeInput,
    ) -> Result<LeaveType, PolicyError> {
        let mut types = self.store.leave_types.write().await;
        let leave_type = types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(PolicyError::LeaveTypeNotFound(id))?;
        PolicyCatalog::apply_update(leave_type, input);

        info!(leave_type_id = %id, is_active = leave_type.is_active, "leave type updated");
        Ok(leave_type.clone())
    }

    /// Fetches a leave type.
    ///
    /// # Errors
    ///
    /// Returns `LeaveTypeNotFound`.
    pub async fn leave_type(&self, id: LeaveTypeId) -> Result<LeaveType, PolicyError> {
        self.store
            .leave_types
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(PolicyError::LeaveTypeNotFound(id))
    }

    /// Fetches a leave type that accepts new requests.
    ///
    /// # Errors
    ///
    /// Returns `LeaveTypeNotFound` or `LeaveTypeInactive`.
    pub async fn active_leave_type(&self, id: LeaveTypeId) -> Result<LeaveType, PolicyError> {
        let leave_type = self.leave_type(id).await?;
        if !leave_type.is_active {
            return Err(PolicyError::LeaveTypeInactive(id));
        }
        Ok(leave_type)
    }

    /// Lists every leave type ordered by code.
    pub async fn list_leave_types(&self) -> Vec<LeaveType> {
        let mut types = self.store.leave_types.read().await.clone();
        types.sort_by(|a, b| a.code.cmp(&b.code));
        types
    }

    /// Assigns a policy, end-dating the one it replaces.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPolicy`, `LeaveTypeNotFound` or `OverlappingPolicy`.
    pub async fn assign_policy(&self, input: AssignPolicyInput) -> Result<Policy, PolicyError> {
        PolicyCatalog::validate_policy(&input)?;
        self.leave_type(input.leave_type_id).await?;

        let mut entry = self
            .store
            .policies
            .entry((input.user_id, input.leave_type_id))
            .or_default();
        let superseded = PolicyCatalog::supersede(entry.value(), &input)?;
        if let Some((id, end_date)) = superseded
            && let Some(current) = entry.value_mut().iter_mut().find(|p| p.id == id)
        {
            current.end_date = Some(end_date);
        }

        let policy = PolicyCatalog::build_policy(input, Utc::now());
        entry.value_mut().push(policy.clone());
        entry.value_mut().sort_by_key(|p| p.effective_date);
        drop(entry);

        info!(
            policy_id = %policy.id,
            user_id = %policy.user_id,
            leave_type_id = %policy.leave_type_id,
            effective_date = %policy.effective_date,
            superseded = superseded.is_some(),
            "policy assigned"
        );
        Ok(policy)
    }

    /// Resolves the policy effective for a user and type on a date.
    ///
    /// # Errors
    ///
    /// Returns `PolicyNotFound`.
    pub fn policy_as_of(
        &self,
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        date: NaiveDate,
    ) -> Result<Policy, PolicyError> {
        let not_found = PolicyError::PolicyNotFound {
            user_id,
            leave_type_id,
            date,
        };
        let Some(policies) = self.store.policies.get(&(user_id, leave_type_id)) else {
            return Err(not_found);
        };
        PolicyCatalog::policy_as_of(policies.value(), user_id, leave_type_id, date).cloned()
    }

    /// The policy that seeds a balance row for `year`: the one in force on
    /// January 1st, else the first one starting during the year.
    pub fn policy_for_year(
        &self,
        user_id: UserId,
        leave_type_id: LeaveTypeId,
        year: i32,
    ) -> Option<Policy> {
        let policies = self.store.policies.get(&(user_id, leave_type_id))?;
        let year_start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        policies
            .iter()
            .find(|p| p.is_effective_on(year_start))
            .or_else(|| policies.iter().find(|p| p.effective_date.year() == year))
            .cloned()
    }

    /// Every policy effective on a date.
    pub fn active_policies_as_of(&self, date: NaiveDate) -> Vec<Policy> {
        self.store
            .policies
            .iter()
            .flat_map(|entry| {
                PolicyCatalog::active_as_of(entry.value(), date)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Policy history for a user and type, oldest first.
    pub fn policies_for(&self, user_id: UserId, leave_type_id: LeaveTypeId) -> Vec<Policy> {
        self.store
            .policies
            .get(&(user_id, leave_type_id))
            .map(|p| p.value().clone())
            .unwrap_or_default()
    }
}
