//! Property-based tests for BlackoutResolver.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Days, NaiveDate, Utc};
use proptest::prelude::*;

use accrue_shared::types::{LeaveTypeId, UserId};

use super::resolver::BlackoutResolver;
use super::types::{CreateBlackoutInput, Restriction, Schedule, Scope};
use crate::directory::EmployeeProfile;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

/// A closed range of 1..=40 days starting within 2026.
fn range() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0u64..365, 0u64..40).prop_map(|(offset, len)| {
        let start = base().checked_add_days(Days::new(offset)).unwrap();
        (start, start.checked_add_days(Days::new(len)).unwrap())
    })
}

fn schedule() -> impl Strategy<Value = Schedule> {
    prop_oneof![
        range().prop_map(|(start, end)| Schedule::Fixed { start, end }),
        (prop::collection::btree_set(0u8..=6, 1..=7), range(), any::<bool>()).prop_map(
            |(days, (s, e), open_start)| Schedule::Recurring {
                days,
                effective_start: (!open_start).then_some(s),
                effective_end: Some(e),
            }
        ),
    ]
}

fn restriction() -> impl Strategy<Value = Restriction> {
    prop_oneof![
        Just(Restriction::FullBlock),
        (1u32..5).prop_map(|max_requests| Restriction::LimitRequests { max_requests }),
        Just(Restriction::WarningOnly),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Matched dates lie inside the requested range and the schedule.
    #[test]
    fn prop_matched_dates_within_both_ranges(
        schedule in schedule(),
        (start, end) in range(),
    ) {
        for d in BlackoutResolver::matched_dates(&schedule, start, end) {
            prop_assert!(d >= start && d <= end);
            match &schedule {
                Schedule::Fixed { start: s, end: e } => prop_assert!(d >= *s && d <= *e),
                Schedule::Recurring { days, effective_start, effective_end } => {
                    prop_assert!(effective_start.is_none_or(|s| d >= s));
                    prop_assert!(effective_end.is_none_or(|e| d <= e));
                    let weekday = u8::try_from(d.weekday().num_days_from_sunday()).unwrap();
                    prop_assert!(days.contains(&weekday));
                }
            }
        }
    }

    /// Each matching blackout lands in exactly one bucket, and full blocks
    /// are always conflicts.
    #[test]
    fn prop_hits_partition_by_restriction(
        defs in prop::collection::vec((schedule(), restriction()), 1..6),
        (start, end) in range(),
        recorded in 0u32..6,
    ) {
        let blackouts: Vec<_> = defs
            .into_iter()
            .map(|(schedule, restriction)| BlackoutResolver::build(
                CreateBlackoutInput {
                    name: "b".to_string(),
                    scope: Scope::CompanyWide,
                    leave_types: BTreeSet::new(),
                    schedule,
                    restriction,
                    allow_emergency_override: false,
                },
                Utc::now(),
            ))
            .collect();
        let usage: HashMap<_, _> = blackouts.iter().map(|b| (b.id, recorded)).collect();
        let eval = BlackoutResolver::evaluate(
            &blackouts,
            &EmployeeProfile::bare(UserId::new()),
            LeaveTypeId::new(),
            start,
            end,
            &usage,
        );

        for b in &blackouts {
            let matched = !BlackoutResolver::matched_dates(&b.schedule, start, end).is_empty();
            let in_conflicts = eval.conflicts.iter().any(|h| h.blackout_id == b.id);
            let in_warnings = eval.warnings.iter().any(|h| h.blackout_id == b.id);
            prop_assert_eq!(matched, in_conflicts || in_warnings);
            prop_assert!(!(in_conflicts && in_warnings));
            if matched {
                match b.restriction {
                    Restriction::FullBlock => prop_assert!(in_conflicts),
                    Restriction::WarningOnly => prop_assert!(in_warnings),
                    Restriction::LimitRequests { max_requests } => {
                        prop_assert_eq!(in_conflicts, recorded >= max_requests);
                    }
                }
            }
        }
    }
}
