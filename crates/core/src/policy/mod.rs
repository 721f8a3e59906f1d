//! Leave types and effective-dated accrual policies.
//!
//! - `types` - LeaveType, Policy, AccrualFrequency
//! - `catalog` - Validation and effective-date resolution
//! - `error` - Policy catalog errors

pub mod catalog;
pub mod error;
pub mod types;

pub use catalog::PolicyCatalog;
pub use error::PolicyError;
pub use types::{
    AccrualFrequency, ApprovalFlags, AssignPolicyInput, CreateLeaveTypeInput, LeaveType, Policy,
    UpdateLeaveTypeInput,
};
