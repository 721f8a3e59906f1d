//! Blackout periods and conflict resolution.
//!
//! - `types` - Scope, Schedule, Restriction and evaluation results
//! - `resolver` - Matching, classification and snapshots
//! - `error` - Blackout errors

pub mod error;
pub mod resolver;
pub mod types;

#[cfg(test)]
mod resolver_props;

pub use error::BlackoutError;
pub use resolver::BlackoutResolver;
pub use types::{
    Blackout, BlackoutEvaluation, BlackoutHit, CreateBlackoutInput, Restriction, Schedule, Scope,
};
