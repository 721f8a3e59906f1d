//! Request validation errors.

use thiserror::Error;

/// Errors raised while validating a leave request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The dates do not form a usable leave range.
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    /// The range spans more calendar days than allowed.
    #[error("Request spans {days} days, more than the allowed {max}")]
    RangeTooLong {
        /// Calendar days requested.
        days: i64,
        /// Allowed maximum.
        max: i64,
    },

    /// An emergency override needs a reason.
    #[error("Emergency override requires a reason")]
    OverrideReasonRequired,
}

impl RequestError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        400
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            Self::RangeTooLong { .. } => "RANGE_TOO_LONG",
            Self::OverrideReasonRequired => "OVERRIDE_REASON_REQUIRED",
        }
    }
}
