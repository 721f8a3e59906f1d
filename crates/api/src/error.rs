//! Error responses.
//!
//! Every domain error already knows its HTTP status and SCREAMING_SNAKE
//! code; this module turns them into `{"error", "message"}` bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use accrue_core::blackout::{BlackoutError, BlackoutHit};
use accrue_core::ledger::LedgerError;
use accrue_core::policy::PolicyError;
use accrue_db::repositories::{BalanceError, LifecycleError};
use accrue_shared::AppError;

/// An error rendered as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    conflicts: Option<Vec<BlackoutHit>>,
}

impl ApiError {
    fn new(status: u16, code: &'static str, message: String) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code,
            message,
            conflicts: None,
        }
    }

    /// 400 for malformed input.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into()).into()
    }

    /// 403 for a caller without rights on the resource.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into()).into()
    }

    /// Replaces the error code, keeping status and message.
    #[must_use]
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = code;
        self
    }

    /// Returns the HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.conflicts {
            Some(conflicts) => json!({
                "error": self.code,
                "message": self.message,
                "conflicts": conflicts,
            }),
            None => json!({
                "error": self.code,
                "message": self.message,
            }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<BlackoutError> for ApiError {
    fn from(err: BlackoutError) -> Self {
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if err.is_fatal() {
            error!(error = %err, "ledger invariant violated");
        }
        Self::new(err.status_code(), err.error_code(), err.to_string())
    }
}

impl From<BalanceError> for ApiError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Ledger(e) => e.into(),
            other => Self::new(other.status_code(), other.error_code(), other.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        if err.is_fatal() {
            error!(error = %err, "ledger invariant violated during request lifecycle");
        }
        let mut api = Self::new(err.status_code(), err.error_code(), err.to_string());
        if let LifecycleError::BlackoutViolation { conflicts } = err {
            api.conflicts = Some(conflicts);
        }
        api
    }
}
