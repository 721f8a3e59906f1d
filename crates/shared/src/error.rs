//! Errors raised outside the domain: configuration, credentials and
//! request validation. Domain crates define their own enums.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, expired or forged credentials.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Valid credentials without rights on the resource.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Malformed request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::Validation(_) => 400,
            Self::Config(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Unauthorized("no token".into()), 401, "UNAUTHORIZED")]
    #[case(AppError::Forbidden("not yours".into()), 403, "FORBIDDEN")]
    #[case(AppError::Validation("bad date".into()), 400, "VALIDATION_ERROR")]
    #[case(AppError::Config("missing jwt.secret".into()), 500, "CONFIG_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_config_error_converts() {
        let err: AppError = config::ConfigError::NotFound("jwt.secret".into()).into();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("jwt.secret")));
    }
}
