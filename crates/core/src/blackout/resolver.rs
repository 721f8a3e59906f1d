//! Blackout conflict resolution.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use accrue_shared::types::{BlackoutId, LeaveTypeId};

use crate::blackout::error::BlackoutError;
use crate::blackout::types::{
    Blackout, BlackoutEvaluation, BlackoutHit, CreateBlackoutInput, Restriction, Schedule, Scope,
};
use crate::directory::EmployeeProfile;

/// Stateless blackout evaluation.
pub struct BlackoutResolver;

impl BlackoutResolver {
    /// Validates a new blackout definition.
    ///
    /// # Errors
    ///
    /// Returns `NameRequired`, `EmptyScope`, `InvalidSchedule` or
    /// `InvalidRestriction`.
    pub fn validate(input: &CreateBlackoutInput) -> Result<(), BlackoutError> {
        if input.name.trim().is_empty() {
            return Err(BlackoutError::NameRequired);
        }

        let empty_scope = match &input.scope {
            Scope::CompanyWide => false,
            Scope::Departments(ids) => ids.is_empty(),
            Scope::Positions(ids) => ids.is_empty(),
            Scope::Users(ids) => ids.is_empty(),
        };
        if empty_scope {
            return Err(BlackoutError::EmptyScope);
        }

        match &input.schedule {
            Schedule::Fixed { start, end } => {
                if start > end {
                    return Err(BlackoutError::InvalidSchedule(format!(
                        "start {start} is after end {end}"
                    )));
                }
            }
            Schedule::Recurring {
                days,
                effective_start,
                effective_end,
            } => {
                if days.is_empty() {
                    return Err(BlackoutError::InvalidSchedule(
                        "recurring schedule needs at least one weekday".to_string(),
                    ));
                }
                if let Some(day) = days.iter().find(|d| **d > 6) {
                    return Err(BlackoutError::InvalidSchedule(format!(
                        "weekday {day} is outside 0..=6"
                    )));
                }
                if let (Some(from), Some(to)) = (effective_start, effective_end)
                    && to < from
                {
                    return Err(BlackoutError::InvalidSchedule(
                        "effective_end is before effective_start".to_string(),
                    ));
                }
            }
        }

        if let Restriction::LimitRequests { max_requests: 0 } = input.restriction {
            return Err(BlackoutError::InvalidRestriction(
                "max_requests must be at least 1; use full_block instead".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds an active blackout from validated input.
    #[must_use]
    pub fn build(input: CreateBlackoutInput, now: DateTime<Utc>) -> Blackout {
        Blackout {
            id: BlackoutId::new(),
            name: input.name.trim().to_string(),
            scope: input.scope,
            leave_types: input.leave_types,
            schedule: input.schedule,
            restriction: input.restriction,
            allow_emergency_override: input.allow_emergency_override,
            is_active: true,
            created_at: now,
        }
    }

    /// True when the blackout is active and covers the employee and type.
    #[must_use]
    pub fn applies_to(blackout: &Blackout, profile: &EmployeeProfile, leave_type_id: LeaveTypeId) -> bool {
        if !blackout.is_active {
            return false;
        }
        if !blackout.leave_types.is_empty() && !blackout.leave_types.contains(&leave_type_id) {
            return false;
        }
        match &blackout.scope {
            Scope::CompanyWide => true,
            Scope::Departments(ids) => profile.department_id.is_some_and(|d| ids.contains(&d)),
            Scope::Positions(ids) => profile.position_id.is_some_and(|p| ids.contains(&p)),
            Scope::Users(ids) => ids.contains(&profile.user_id),
        }
    }

    /// Requested dates inside the schedule.
    #[must_use]
    pub fn matched_dates(schedule: &Schedule, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        match schedule {
            Schedule::Fixed {
                start: block_start,
                end: block_end,
            } => {
                let from = start.max(*block_start);
                let to = end.min(*block_end);
                days_between(from, to).collect()
            }
            Schedule::Recurring {
                days,
                effective_start,
                effective_end,
            } => {
                let from = effective_start.map_or(start, |s| start.max(s));
                let to = effective_end.map_or(end, |e| end.min(e));
                days_between(from, to)
                    .filter(|d| is_listed_weekday(days, *d))
                    .collect()
            }
        }
    }

    /// Evaluates a date range against every blackout.
    ///
    /// `usage` holds the pending and approved requests already recorded
    /// against each blackout.
    #[must_use]
    pub fn evaluate<'a>(
        blackouts: impl IntoIterator<Item = &'a Blackout>,
        profile: &EmployeeProfile,
        leave_type_id: LeaveTypeId,
        start: NaiveDate,
        end: NaiveDate,
        usage: &HashMap<BlackoutId, u32>,
    ) -> BlackoutEvaluation {
        let mut evaluation = BlackoutEvaluation::default();

        for blackout in blackouts {
            if !Self::applies_to(blackout, profile, leave_type_id) {
                continue;
            }
            let matched_dates = Self::matched_dates(&blackout.schedule, start, end);
            if matched_dates.is_empty() {
                continue;
            }

            let hit = BlackoutHit {
                blackout_id: blackout.id,
                name: blackout.name.clone(),
                restriction: blackout.restriction,
                matched_dates,
                allow_emergency_override: blackout.allow_emergency_override,
            };
            let blocks = match blackout.restriction {
                Restriction::FullBlock => true,
                Restriction::LimitRequests { max_requests } => {
                    usage.get(&blackout.id).copied().unwrap_or(0) >= max_requests
                }
                Restriction::WarningOnly => false,
            };
            if blocks {
                evaluation.conflicts.push(hit);
            } else {
                evaluation.warnings.push(hit);
            }
        }

        evaluation
    }

    /// Serializes the definitions of every matched blackout.
    ///
    /// # Errors
    ///
    /// Returns `Snapshot` if serialization fails.
    pub fn snapshot(
        blackouts: &[Blackout],
        evaluation: &BlackoutEvaluation,
    ) -> Result<serde_json::Value, BlackoutError> {
        let matched: BTreeSet<BlackoutId> = evaluation.matched_ids().collect();
        let definitions: Vec<&Blackout> = blackouts
            .iter()
            .filter(|b| matched.contains(&b.id))
            .collect();
        Ok(serde_json::to_value(definitions)?)
    }
}

fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

fn is_listed_weekday(days: &BTreeSet<u8>, date: NaiveDate) -> bool {
    let weekday = date.weekday().num_days_from_sunday();
    days.iter().any(|d| u32::from(*d) == weekday)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_shared::types::{DepartmentId, UserId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn blackout(scope: Scope, schedule: Schedule, restriction: Restriction) -> Blackout {
        BlackoutResolver::build(
            CreateBlackoutInput {
                name: "Quarter close".to_string(),
                scope,
                leave_types: BTreeSet::new(),
                schedule,
                restriction,
                allow_emergency_override: false,
            },
            Utc::now(),
        )
    }

    fn fixed(start: NaiveDate, end: NaiveDate) -> Schedule {
        Schedule::Fixed { start, end }
    }

    #[test]
    fn test_fixed_overlap_is_conflict() {
        let b = blackout(
            Scope::CompanyWide,
            fixed(date(2026, 3, 30), date(2026, 4, 3)),
            Restriction::FullBlock,
        );
        let profile = EmployeeProfile::bare(UserId::new());
        let eval = BlackoutResolver::evaluate(
            [&b],
            &profile,
            LeaveTypeId::new(),
            date(2026, 4, 2),
            date(2026, 4, 8),
            &HashMap::new(),
        );
        assert_eq!(eval.conflicts.len(), 1);
        assert_eq!(eval.conflicts[0].matched_dates, vec![date(2026, 4, 2), date(2026, 4, 3)]);
        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_no_overlap_no_hit() {
        let b = blackout(
            Scope::CompanyWide,
            fixed(date(2026, 3, 30), date(2026, 4, 3)),
            Restriction::FullBlock,
        );
        let eval = BlackoutResolver::evaluate(
            [&b],
            &EmployeeProfile::bare(UserId::new()),
            LeaveTypeId::new(),
            date(2026, 4, 4),
            date(2026, 4, 8),
            &HashMap::new(),
        );
        assert!(!eval.has_conflicts());
        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_recurring_matches_weekday() {
        // Fridays only.
        let schedule = Schedule::Recurring {
            days: BTreeSet::from([5]),
            effective_start: Some(date(2026, 1, 1)),
            effective_end: None,
        };
        // 2026-03-02 is a Monday.
        assert!(BlackoutResolver::matched_dates(&schedule, date(2026, 3, 2), date(2026, 3, 5)).is_empty());
        assert_eq!(
            BlackoutResolver::matched_dates(&schedule, date(2026, 3, 2), date(2026, 3, 13)),
            vec![date(2026, 3, 6), date(2026, 3, 13)]
        );
    }

    #[test]
    fn test_recurring_respects_effective_window() {
        let schedule = Schedule::Recurring {
            days: BTreeSet::from([5]),
            effective_start: Some(date(2026, 3, 10)),
            effective_end: Some(date(2026, 3, 12)),
        };
        assert!(BlackoutResolver::matched_dates(&schedule, date(2026, 3, 2), date(2026, 3, 31)).is_empty());
    }

    #[test]
    fn test_recurring_without_window_is_unbounded() {
        let schedule: Schedule =
            serde_json::from_str(r#"{"type": "recurring", "days": [1]}"#).unwrap();
        assert_eq!(
            schedule,
            Schedule::Recurring {
                days: BTreeSet::from([1]),
                effective_start: None,
                effective_end: None,
            }
        );
        // Mondays in 1999 and 2031 alike.
        assert_eq!(
            BlackoutResolver::matched_dates(&schedule, date(1999, 3, 1), date(1999, 3, 2)),
            vec![date(1999, 3, 1)]
        );
        assert_eq!(
            BlackoutResolver::matched_dates(&schedule, date(2031, 3, 3), date(2031, 3, 4)),
            vec![date(2031, 3, 3)]
        );
    }

    #[test]
    fn test_limit_requests_turns_into_conflict() {
        let b = blackout(
            Scope::CompanyWide,
            fixed(date(2026, 12, 20), date(2026, 12, 31)),
            Restriction::LimitRequests { max_requests: 2 },
        );
        let profile = EmployeeProfile::bare(UserId::new());
        let run = |count: u32| {
            BlackoutResolver::evaluate(
                [&b],
                &profile,
                LeaveTypeId::new(),
                date(2026, 12, 21),
                date(2026, 12, 22),
                &HashMap::from([(b.id, count)]),
            )
        };
        assert_eq!(run(1).warnings.len(), 1);
        assert_eq!(run(2).conflicts.len(), 1);
    }

    #[test]
    fn test_warning_only_never_blocks() {
        let b = blackout(
            Scope::CompanyWide,
            fixed(date(2026, 5, 1), date(2026, 5, 1)),
            Restriction::WarningOnly,
        );
        let eval = BlackoutResolver::evaluate(
            [&b],
            &EmployeeProfile::bare(UserId::new()),
            LeaveTypeId::new(),
            date(2026, 5, 1),
            date(2026, 5, 1),
            &HashMap::new(),
        );
        assert!(!eval.has_conflicts());
        assert_eq!(eval.warnings.len(), 1);
    }

    #[test]
    fn test_scope_and_type_filters() {
        let dept = DepartmentId::new();
        let vacation = LeaveTypeId::new();
        let mut b = blackout(
            Scope::Departments(BTreeSet::from([dept])),
            fixed(date(2026, 5, 1), date(2026, 5, 1)),
            Restriction::FullBlock,
        );
        b.leave_types.insert(vacation);

        let mut member = EmployeeProfile::bare(UserId::new());
        member.department_id = Some(dept);
        let outsider = EmployeeProfile::bare(UserId::new());

        assert!(BlackoutResolver::applies_to(&b, &member, vacation));
        assert!(!BlackoutResolver::applies_to(&b, &member, LeaveTypeId::new()));
        assert!(!BlackoutResolver::applies_to(&b, &outsider, vacation));

        b.is_active = false;
        assert!(!BlackoutResolver::applies_to(&b, &member, vacation));
    }

    #[test]
    fn test_validate_rejects_bad_definitions() {
        let base = CreateBlackoutInput {
            name: "Freeze".to_string(),
            scope: Scope::CompanyWide,
            leave_types: BTreeSet::new(),
            schedule: fixed(date(2026, 5, 2), date(2026, 5, 1)),
            restriction: Restriction::FullBlock,
            allow_emergency_override: false,
        };
        assert!(matches!(
            BlackoutResolver::validate(&base),
            Err(BlackoutError::InvalidSchedule(_))
        ));

        let mut weekdays = base.clone();
        weekdays.schedule = Schedule::Recurring {
            days: BTreeSet::from([7]),
            effective_start: Some(date(2026, 1, 1)),
            effective_end: None,
        };
        assert!(BlackoutResolver::validate(&weekdays).is_err());

        let mut scope = base.clone();
        scope.schedule = fixed(date(2026, 5, 1), date(2026, 5, 2));
        scope.scope = Scope::Users(BTreeSet::new());
        assert!(matches!(BlackoutResolver::validate(&scope), Err(BlackoutError::EmptyScope)));

        let mut name = base;
        name.schedule = fixed(date(2026, 5, 1), date(2026, 5, 2));
        name.name = " ".to_string();
        assert!(matches!(BlackoutResolver::validate(&name), Err(BlackoutError::NameRequired)));
    }

    #[test]
    fn test_snapshot_contains_matched_definitions() {
        let hit = blackout(
            Scope::CompanyWide,
            fixed(date(2026, 5, 1), date(2026, 5, 1)),
            Restriction::WarningOnly,
        );
        let miss = blackout(
            Scope::CompanyWide,
            fixed(date(2026, 6, 1), date(2026, 6, 1)),
            Restriction::FullBlock,
        );
        let all = vec![hit.clone(), miss];
        let eval = BlackoutResolver::evaluate(
            &all,
            &EmployeeProfile::bare(UserId::new()),
            LeaveTypeId::new(),
            date(2026, 5, 1),
            date(2026, 5, 1),
            &HashMap::new(),
        );
        let snapshot = BlackoutResolver::snapshot(&all, &eval).unwrap();
        let items = snapshot.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], serde_json::json!(hit.id));
    }
}
