//! Leave type and policy domain types.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use accrue_shared::types::{LeaveTypeId, PolicyId, UserId};

/// How often a policy accrues.
///
/// Periods are calendar aligned: months start on the 1st, quarters on
/// January/April/July/October 1st, years on January 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccrualFrequency {
    /// Twelve periods per year.
    Monthly,
    /// Four periods per year.
    Quarterly,
    /// One period per year.
    Annually,
}

impl AccrualFrequency {
    /// Returns the string representation of the frequency.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
        }
    }

    /// Parses a frequency from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "annually" | "yearly" => Some(Self::Annually),
            _ => None,
        }
    }

    /// Number of accrual periods in one year.
    #[must_use]
    pub const fn periods_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::Annually => 1,
        }
    }

    /// Length of one period in months.
    #[must_use]
    pub const fn months_per_period(&self) -> u32 {
        12 / self.periods_per_year()
    }

    /// Returns the first day of the period containing `date`.
    #[must_use]
    pub fn period_start(&self, date: NaiveDate) -> Option<NaiveDate> {
        let step = self.months_per_period();
        let month0 = (date.month0() / step) * step;
        NaiveDate::from_ymd_opt(date.year(), month0 + 1, 1)
    }

    /// Returns the first period boundary strictly after `date`.
    #[must_use]
    pub fn next_boundary_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.period_start(date)?
            .checked_add_months(Months::new(self.months_per_period()))
    }
}

impl std::fmt::Display for AccrualFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval routing flags of a leave type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalFlags {
    /// Require one extra supervisor level above the one whose limit covers the request.
    #[serde(default)]
    pub multi_level_approval: bool,
    /// Skip the org hierarchy entirely.
    #[serde(default)]
    pub disable_hierarchy_approval: bool,
    /// Fixed approvers that replace hierarchy routing when non-empty.
    #[serde(default)]
    pub specific_approvers: BTreeSet<UserId>,
}

/// A kind of leave (vacation, sick, parental...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveType {
    /// Unique identifier.
    pub id: LeaveTypeId,
    /// Unique short code (e.g. "VAC").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Approval routing flags.
    pub flags: ApprovalFlags,
    /// Whether requests draw down a balance.
    pub uses_balance: bool,
    /// Whether balances may go below zero (bounded by the policy cap).
    pub negative_allowed: bool,
    /// Whether unused days may roll into the next year.
    pub carryover_allowed: bool,
    /// Inactive types accept no new requests.
    pub is_active: bool,
    /// When the type was created.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a leave type.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLeaveTypeInput {
    /// Unique short code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Approval routing flags.
    #[serde(default)]
    pub flags: ApprovalFlags,
    /// Whether requests draw down a balance.
    #[serde(default = "default_true")]
    pub uses_balance: bool,
    /// Whether balances may go below zero.
    #[serde(default)]
    pub negative_allowed: bool,
    /// Whether unused days may roll into the next year.
    #[serde(default)]
    pub carryover_allowed: bool,
}

/// Changes allowed on an existing leave type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLeaveTypeInput {
    /// Replacement approval flags.
    #[serde(default)]
    pub flags: Option<ApprovalFlags>,
    /// New active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Accrual and balance rules for one user and one leave type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique identifier.
    pub id: PolicyId,
    /// The employee this policy applies to.
    pub user_id: UserId,
    /// The leave type this policy applies to.
    pub leave_type_id: LeaveTypeId,
    /// Days granted when a yearly balance row is opened.
    pub initial_days: Decimal,
    /// Days accrued over a full year.
    pub annual_accrual_amount: Decimal,
    /// Extra days per year once the service threshold is met.
    pub bonus_days_per_year: Decimal,
    /// Completed service years required for the bonus.
    pub years_for_bonus: u32,
    /// Accrual period length.
    pub accrual_frequency: AccrualFrequency,
    /// Whether unused days roll over at year end.
    pub rollover_enabled: bool,
    /// Rollover cap (None = uncapped).
    pub max_rollover_days: Option<Decimal>,
    /// How far below zero the balance may go when the type allows it.
    pub max_negative_balance: Decimal,
    /// Prorate the first, partial accrual period.
    pub prorate_first_year: bool,
    /// First day the policy applies.
    pub effective_date: NaiveDate,
    /// Last day the policy applies (None = open ended).
    pub end_date: Option<NaiveDate>,
    /// When the policy was assigned.
    pub created_at: DateTime<Utc>,
}

impl Policy {
    /// Returns true if the policy applies on `date`.
    #[must_use]
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        date >= self.effective_date && self.end_date.is_none_or(|end| date <= end)
    }

    /// Days accrued in one full period, rounded to 4 decimal places.
    #[must_use]
    pub fn accrual_per_period(&self) -> Decimal {
        (self.annual_accrual_amount / Decimal::from(self.accrual_frequency.periods_per_year()))
            .round_dp(4)
    }
}

/// Input for assigning a policy.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignPolicyInput {
    /// The employee.
    pub user_id: UserId,
    /// The leave type.
    pub leave_type_id: LeaveTypeId,
    /// Days granted when a yearly balance row is opened.
    #[serde(default)]
    pub initial_days: Decimal,
    /// Days accrued over a full year.
    #[serde(default)]
    pub annual_accrual_amount: Decimal,
    /// Extra days per year once the service threshold is met.
    #[serde(default)]
    pub bonus_days_per_year: Decimal,
    /// Completed service years required for the bonus.
    #[serde(default)]
    pub years_for_bonus: u32,
    /// Accrual period length.
    pub accrual_frequency: AccrualFrequency,
    /// Whether unused days roll over at year end.
    #[serde(default)]
    pub rollover_enabled: bool,
    /// Rollover cap.
    #[serde(default)]
    pub max_rollover_days: Option<Decimal>,
    /// Negative balance cap.
    #[serde(default)]
    pub max_negative_balance: Decimal,
    /// Prorate the first, partial accrual period.
    #[serde(default)]
    pub prorate_first_year: bool,
    /// First day the policy applies.
    pub effective_date: NaiveDate,
    /// Last day the policy applies.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(AccrualFrequency::Monthly, date(2026, 1, 1), date(2026, 2, 1))]
    #[case(AccrualFrequency::Monthly, date(2026, 1, 31), date(2026, 2, 1))]
    #[case(AccrualFrequency::Monthly, date(2026, 12, 15), date(2027, 1, 1))]
    #[case(AccrualFrequency::Quarterly, date(2026, 2, 10), date(2026, 4, 1))]
    #[case(AccrualFrequency::Quarterly, date(2026, 10, 1), date(2027, 1, 1))]
    #[case(AccrualFrequency::Annually, date(2026, 6, 1), date(2027, 1, 1))]
    fn test_next_boundary_after(
        #[case] freq: AccrualFrequency,
        #[case] from: NaiveDate,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(freq.next_boundary_after(from), Some(expected));
    }

    #[test]
    fn test_period_start() {
        assert_eq!(
            AccrualFrequency::Quarterly.period_start(date(2026, 8, 20)),
            Some(date(2026, 7, 1))
        );
        assert_eq!(
            AccrualFrequency::Annually.period_start(date(2026, 8, 20)),
            Some(date(2026, 1, 1))
        );
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!(AccrualFrequency::parse("MONTHLY"), Some(AccrualFrequency::Monthly));
        assert_eq!(AccrualFrequency::parse("yearly"), Some(AccrualFrequency::Annually));
        assert_eq!(AccrualFrequency::parse("weekly"), None);
    }

    #[test]
    fn test_accrual_per_period() {
        let mut policy = Policy {
            id: PolicyId::new(),
            user_id: UserId::new(),
            leave_type_id: LeaveTypeId::new(),
            initial_days: Decimal::ZERO,
            annual_accrual_amount: dec!(12),
            bonus_days_per_year: Decimal::ZERO,
            years_for_bonus: 0,
            accrual_frequency: AccrualFrequency::Monthly,
            rollover_enabled: false,
            max_rollover_days: None,
            max_negative_balance: Decimal::ZERO,
            prorate_first_year: false,
            effective_date: date(2026, 1, 1),
            end_date: None,
            created_at: Utc::now(),
        };
        assert_eq!(policy.accrual_per_period(), dec!(1));

        policy.annual_accrual_amount = dec!(10);
        assert_eq!(policy.accrual_per_period(), dec!(0.8333));

        policy.accrual_frequency = AccrualFrequency::Quarterly;
        assert_eq!(policy.accrual_per_period(), dec!(2.5));
    }

    #[test]
    fn test_policy_effective_window() {
        let policy = Policy {
            id: PolicyId::new(),
            user_id: UserId::new(),
            leave_type_id: LeaveTypeId::new(),
            initial_days: Decimal::ZERO,
            annual_accrual_amount: Decimal::ZERO,
            bonus_days_per_year: Decimal::ZERO,
            years_for_bonus: 0,
            accrual_frequency: AccrualFrequency::Annually,
            rollover_enabled: false,
            max_rollover_days: None,
            max_negative_balance: Decimal::ZERO,
            prorate_first_year: false,
            effective_date: date(2026, 3, 1),
            end_date: Some(date(2026, 9, 30)),
            created_at: Utc::now(),
        };
        assert!(!policy.is_effective_on(date(2026, 2, 28)));
        assert!(policy.is_effective_on(date(2026, 3, 1)));
        assert!(policy.is_effective_on(date(2026, 9, 30)));
        assert!(!policy.is_effective_on(date(2026, 10, 1)));
    }
}
