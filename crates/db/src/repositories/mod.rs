//! Repository abstractions over the in-process store.
//!
//! Repositories fetch rows, run the domain services of `accrue-core` on
//! them and write the result back, hiding the locking from callers.

pub mod balance;
pub mod blackout;
pub mod policy;
pub mod workflow;


pub use balance::{AccrualFailure, AccrualRun, BalanceError, BalanceRepository, RolloverRun};
pub use blackout::{BlackoutCheck, BlackoutRepository};
pub use policy::PolicyRepository;
pub use workflow::{LifecycleError, RequestView, WorkflowRepository, WorkflowSettings};
