//! Blackout error types.

use thiserror::Error;

use accrue_shared::types::BlackoutId;

/// Errors that can occur while managing or evaluating blackouts.
#[derive(Debug, Error)]
pub enum BlackoutError {
    /// Blackout not found.
    #[error("Blackout {0} not found")]
    BlackoutNotFound(BlackoutId),

    /// Name is empty.
    #[error("Blackout name is required")]
    NameRequired,

    /// Schedule is malformed.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Restriction is malformed.
    #[error("Invalid restriction: {0}")]
    InvalidRestriction(String),

    /// Scope names no members.
    #[error("Scope must name at least one member")]
    EmptyScope,

    /// Definitions could not be serialized for the request snapshot.
    #[error("Failed to snapshot blackouts: {0}")]
    Snapshot(String),
}

impl BlackoutError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::BlackoutNotFound(_) => 404,
            Self::NameRequired
            | Self::InvalidSchedule(_)
            | Self::InvalidRestriction(_)
            | Self::EmptyScope => 400,
            Self::Snapshot(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BlackoutNotFound(_) => "BLACKOUT_NOT_FOUND",
            Self::NameRequired => "NAME_REQUIRED",
            Self::InvalidSchedule(_) => "INVALID_SCHEDULE",
            Self::InvalidRestriction(_) => "INVALID_RESTRICTION",
            Self::EmptyScope => "EMPTY_SCOPE",
            Self::Snapshot(_) => "SNAPSHOT_FAILED",
        }
    }
}

impl From<serde_json::Error> for BlackoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}
