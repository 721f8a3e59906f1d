//! Bearer token authentication and role gates.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::AppState;
use crate::error::ApiError;
use accrue_shared::types::UserId;
use accrue_shared::{AppError, Claims, JwtError, Role};

/// Token of an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn unauthorized(code: &'static str, message: &str) -> Response {
    ApiError::from(AppError::Unauthorized(message.to_string()))
        .with_code(code)
        .into_response()
}

/// Verifies the bearer token and stores its claims for `AuthUser`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized(
            "MISSING_TOKEN",
            "Authorization header with Bearer token is required",
        );
    };

    let claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(JwtError::Expired) => return unauthorized("TOKEN_EXPIRED", "Token has expired"),
        Err(err) => {
            debug!(error = %err, "bearer token rejected");
            return unauthorized("INVALID_TOKEN", "Invalid or malformed token");
        }
    };
    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// Rejects callers whose token does not carry the admin role.
///
/// Must run inside `auth_middleware`.
pub async fn admin_middleware(request: Request, next: Next) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return unauthorized("UNAUTHORIZED", "Authentication required");
    };
    if !claims.is_admin() {
        warn!(
            user_id = %claims.user_id(),
            role = %claims.role,
            path = %request.uri().path(),
            "admin route refused"
        );
        return ApiError::forbidden("Administrator role required").into_response();
    }
    next.run(request).await
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the caller's user ID.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0.user_id()
    }

    /// Returns the caller's role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.0.role
    }

    /// Returns true for administrators.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.0.is_admin()
    }

    /// Passes when the caller is `owner` or an administrator.
    ///
    /// # Errors
    ///
    /// Returns a 403 `ApiError` otherwise.
    pub fn require_self_or_admin(&self, owner: UserId) -> Result<(), ApiError> {
        if self.user_id() == owner || self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to access another user's data"))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| unauthorized("UNAUTHORIZED", "Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc", Some("abc"))]
    #[case("bearer abc", Some("abc"))]
    #[case("BEARER  abc", Some("abc"))]
    #[case("Basic abc", None)]
    #[case("Bearer", None)]
    #[case("abc", None)]
    fn test_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(header).unwrap());
        assert_eq!(bearer_token(&headers), expected);
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
