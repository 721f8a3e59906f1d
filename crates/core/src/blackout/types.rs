//! Blackout rule types.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use accrue_shared::types::{BlackoutId, DepartmentId, LeaveTypeId, PositionId, UserId};

/// Who a blackout applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ids", rename_all = "snake_case")]
pub enum Scope {
    /// Everyone.
    CompanyWide,
    /// Members of any listed department.
    Departments(BTreeSet<DepartmentId>),
    /// Holders of any listed position.
    Positions(BTreeSet<PositionId>),
    /// The listed employees.
    Users(BTreeSet<UserId>),
}

/// When a blackout is in force.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// A closed date interval.
    Fixed {
        /// First blocked day.
        start: NaiveDate,
        /// Last blocked day.
        end: NaiveDate,
    },
    /// Weekdays inside an optional effective window.
    Recurring {
        /// Weekdays, 0 = Sunday through 6 = Saturday.
        days: BTreeSet<u8>,
        /// First day the pattern applies (None = always has applied).
        #[serde(default)]
        effective_start: Option<NaiveDate>,
        /// Last day the pattern applies (None = open ended).
        #[serde(default)]
        effective_end: Option<NaiveDate>,
    },
}

/// What a matching blackout does to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Restriction {
    /// Always a conflict.
    FullBlock,
    /// A conflict once `max_requests` requests are already recorded.
    LimitRequests {
        /// Requests admitted before the blackout blocks.
        max_requests: u32,
    },
    /// Never blocks.
    WarningOnly,
}

/// A blackout rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    /// Unique identifier.
    pub id: BlackoutId,
    /// Display name.
    pub name: String,
    /// Who it applies to.
    pub scope: Scope,
    /// Leave types it applies to (empty = all).
    pub leave_types: BTreeSet<LeaveTypeId>,
    /// When it is in force.
    pub schedule: Schedule,
    /// Effect on matching requests.
    pub restriction: Restriction,
    /// Whether a signed-off emergency override may bypass it.
    pub allow_emergency_override: bool,
    /// Inactive blackouts are ignored.
    pub is_active: bool,
    /// When it was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a blackout.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateBlackoutInput {
    /// Display name.
    pub name: String,
    /// Who it applies to.
    pub scope: Scope,
    /// Leave types it applies to.
    #[serde(default)]
    pub leave_types: BTreeSet<LeaveTypeId>,
    /// When it is in force.
    pub schedule: Schedule,
    /// Effect on matching requests.
    pub restriction: Restriction,
    /// Whether emergency overrides may bypass it.
    #[serde(default)]
    pub allow_emergency_override: bool,
}

/// One blackout matched by a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutHit {
    /// The blackout.
    pub blackout_id: BlackoutId,
    /// Its name.
    pub name: String,
    /// Its restriction.
    pub restriction: Restriction,
    /// Requested dates that fall inside it.
    pub matched_dates: Vec<NaiveDate>,
    /// Whether an emergency override may bypass it.
    pub allow_emergency_override: bool,
}

/// Result of evaluating a request against all blackouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutEvaluation {
    /// Blocking hits.
    pub conflicts: Vec<BlackoutHit>,
    /// Informational hits.
    pub warnings: Vec<BlackoutHit>,
}

impl BlackoutEvaluation {
    /// True when at least one hit blocks.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// True when every conflict may be bypassed by an emergency override.
    #[must_use]
    pub fn all_conflicts_overridable(&self) -> bool {
        self.conflicts.iter().all(|c| c.allow_emergency_override)
    }

    /// Ids of every matched blackout, conflicts first.
    pub fn matched_ids(&self) -> impl Iterator<Item = BlackoutId> + '_ {
        self.conflicts
            .iter()
            .chain(self.warnings.iter())
            .map(|h| h.blackout_id)
    }
}
