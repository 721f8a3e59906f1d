//! Approval chain construction.
//!
//! Routing precedence:
//! 1. Specific approvers on the leave type: one parallel level.
//! 2. Hierarchy approval disabled: no rows, the request auto-approves.
//! 3. Supervisor walk up to the first one whose ceiling covers the request,
//!    plus one more level for multi-level types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use accrue_shared::types::{RequestId, UserId};

use crate::directory::{DirectoryError, OrgDirectory};
use crate::policy::LeaveType;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::Approval;

/// Stateless approval chain builder.
pub struct ApprovalChainBuilder;

impl ApprovalChainBuilder {
    /// Builds the rows for a new request.
    ///
    /// An empty result means the request needs no approval.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChain` when nobody can approve (no supervisors, a
    /// cyclic or too deep hierarchy, or only the requester listed) and
    /// `Directory` when the directory is unreachable.
    pub fn build(
        request_id: RequestId,
        requester: UserId,
        leave_type: &LeaveType,
        total_days: Decimal,
        directory: &dyn OrgDirectory,
        as_of: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Approval>, WorkflowError> {
        let flags = &leave_type.flags;

        if !flags.specific_approvers.is_empty() {
            let rows: Vec<Approval> = flags
                .specific_approvers
                .iter()
                .filter(|id| **id != requester)
                .zip(1u32..)
                .map(|(approver, sequence)| {
                    Approval::pending(request_id, *approver, 1, sequence, true, now)
                })
                .collect();
            if rows.is_empty() {
                return Err(WorkflowError::InvalidChain(
                    "the requester is the only listed approver".to_string(),
                ));
            }
            return Ok(Self::activate_first_level(rows, now));
        }

        if flags.disable_hierarchy_approval {
            return Ok(Vec::new());
        }

        let supervisors = directory
            .supervisor_chain(requester, as_of)
            .map_err(|err| match err {
                DirectoryError::CycleDetected(_) | DirectoryError::DepthExceeded(_) => {
                    WorkflowError::InvalidChain(err.to_string())
                }
                other => WorkflowError::Directory(other),
            })?;
        if supervisors.is_empty() {
            return Err(WorkflowError::InvalidChain(format!(
                "user {requester} has no supervisor"
            )));
        }

        let mut approvers = Vec::new();
        let mut covered_at = None;
        for (index, supervisor) in supervisors.iter().enumerate() {
            approvers.push(*supervisor);
            let limit = directory.approval_limit(*supervisor, leave_type.id)?;
            if limit.is_some_and(|max_days| max_days >= total_days) {
                covered_at = Some(index);
                break;
            }
        }
        if let Some(index) = covered_at
            && flags.multi_level_approval
            && let Some(above) = supervisors.get(index + 1)
        {
            approvers.push(*above);
        }

        let rows = approvers
            .into_iter()
            .zip(1u32..)
            .map(|(approver, level)| Approval::pending(request_id, approver, level, 1, false, now))
            .collect();
        Ok(Self::activate_first_level(rows, now))
    }

    fn activate_first_level(mut rows: Vec<Approval>, now: DateTime<Utc>) -> Vec<Approval> {
        for row in rows.iter_mut().filter(|r| r.level == 1) {
            row.activated_at = Some(now);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::EmployeeProfile;
    use crate::policy::ApprovalFlags;
    use accrue_shared::types::LeaveTypeId;
    use rust_decimal_macros::dec;
    use std::collections::{BTreeSet, HashMap};

    struct TestDirectory {
        supervisors: HashMap<UserId, UserId>,
        limits: HashMap<UserId, Decimal>,
        down: bool,
    }

    impl OrgDirectory for TestDirectory {
        fn supervisor_of(
            &self,
            user_id: UserId,
            _as_of: NaiveDate,
        ) -> Result<Option<UserId>, DirectoryError> {
            if self.down {
                return Err(DirectoryError::Unavailable("connection refused".to_string()));
            }
            Ok(self.supervisors.get(&user_id).copied())
        }

        fn profile(&self, user_id: UserId) -> Result<EmployeeProfile, DirectoryError> {
            Ok(EmployeeProfile::bare(user_id))
        }

        fn approval_limit(
            &self,
            approver_id: UserId,
            _leave_type_id: LeaveTypeId,
        ) -> Result<Option<Decimal>, DirectoryError> {
            Ok(self.limits.get(&approver_id).copied())
        }
    }

    /// employee -> manager (3 days) -> director (10 days) -> vp (no limit)
    fn org() -> (TestDirectory, [UserId; 4]) {
        let ids = [UserId::new(), UserId::new(), UserId::new(), UserId::new()];
        let directory = TestDirectory {
            supervisors: HashMap::from([(ids[0], ids[1]), (ids[1], ids[2]), (ids[2], ids[3])]),
            limits: HashMap::from([(ids[1], dec!(3)), (ids[2], dec!(10))]),
            down: false,
        };
        (directory, ids)
    }

    fn leave_type(flags: ApprovalFlags) -> LeaveType {
        LeaveType {
            id: LeaveTypeId::new(),
            code: "VAC".to_string(),
            name: "Vacation".to_string(),
            flags,
            uses_balance: true,
            negative_allowed: false,
            carryover_allowed: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn build(
        lt: &LeaveType,
        directory: &TestDirectory,
        requester: UserId,
        days: Decimal,
    ) -> Result<Vec<Approval>, WorkflowError> {
        ApprovalChainBuilder::build(
            RequestId::new(),
            requester,
            lt,
            days,
            directory,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn test_stops_at_first_covering_supervisor() {
        let (directory, ids) = org();
        let lt = leave_type(ApprovalFlags::default());

        let rows = build(&lt, &directory, ids[0], dec!(2)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].approver_id, ids[1]);

        let rows = build(&lt, &directory, ids[0], dec!(5)).unwrap();
        let approvers: Vec<_> = rows.iter().map(|r| (r.approver_id, r.level)).collect();
        assert_eq!(approvers, vec![(ids[1], 1), (ids[2], 2)]);
        assert!(rows[0].activated_at.is_some());
        assert!(rows[1].activated_at.is_none());
    }

    #[test]
    fn test_multi_level_adds_one_more() {
        let (directory, ids) = org();
        let lt = leave_type(ApprovalFlags {
            multi_level_approval: true,
            ..ApprovalFlags::default()
        });
        let rows = build(&lt, &directory, ids[0], dec!(2)).unwrap();
        let approvers: Vec<_> = rows.iter().map(|r| r.approver_id).collect();
        assert_eq!(approvers, vec![ids[1], ids[2]]);
    }

    #[test]
    fn test_uncovered_request_goes_to_the_top() {
        let (directory, ids) = org();
        let lt = leave_type(ApprovalFlags::default());
        let rows = build(&lt, &directory, ids[0], dec!(20)).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].approver_id, ids[3]);
        assert!(rows.iter().all(|r| r.is_required && !r.is_parallel));
    }

    #[test]
    fn test_specific_approvers_are_parallel_level_one() {
        let (directory, ids) = org();
        let hr = UserId::new();
        let lt = leave_type(ApprovalFlags {
            specific_approvers: BTreeSet::from([hr, ids[3], ids[0]]),
            ..ApprovalFlags::default()
        });
        let rows = build(&lt, &directory, ids[0], dec!(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.level == 1 && r.is_parallel && r.is_required));
        assert!(rows.iter().all(|r| r.approver_id != ids[0]));
    }

    #[test]
    fn test_disabled_hierarchy_yields_empty_chain() {
        let (directory, ids) = org();
        let lt = leave_type(ApprovalFlags {
            disable_hierarchy_approval: true,
            ..ApprovalFlags::default()
        });
        assert!(build(&lt, &directory, ids[0], dec!(2)).unwrap().is_empty());
    }

    #[test]
    fn test_top_of_org_has_no_chain() {
        let (directory, ids) = org();
        let lt = leave_type(ApprovalFlags::default());
        assert!(matches!(
            build(&lt, &directory, ids[3], dec!(1)),
            Err(WorkflowError::InvalidChain(_))
        ));
    }

    #[test]
    fn test_cycle_is_invalid_chain() {
        let a = UserId::new();
        let b = UserId::new();
        let directory = TestDirectory {
            supervisors: HashMap::from([(a, b), (b, a)]),
            limits: HashMap::new(),
            down: false,
        };
        let lt = leave_type(ApprovalFlags::default());
        assert!(matches!(
            build(&lt, &directory, a, dec!(1)),
            Err(WorkflowError::InvalidChain(_))
        ));
    }

    #[test]
    fn test_unavailable_directory_surfaces() {
        let (mut directory, ids) = org();
        directory.down = true;
        let lt = leave_type(ApprovalFlags::default());
        assert!(matches!(
            build(&lt, &directory, ids[0], dec!(1)),
            Err(WorkflowError::Directory(DirectoryError::Unavailable(_)))
        ));
    }
}
