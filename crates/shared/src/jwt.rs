//! Bearer token minting and verification (HS256).
//!
//! Identity is owned by an external provider that shares the signing
//! secret. The server only verifies tokens; minting exists for tooling and
//! tests.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::{Claims, Role};
use crate::types::UserId;

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HS256 secret.
    pub secret: String,
    /// Lifetime of minted tokens, in minutes.
    pub access_token_expires_minutes: i64,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_minutes: 15,
            leeway_secs: 30,
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// Token is past its `exp`.
    #[error("token has expired")]
    Expired,

    /// Bad signature, missing claim or unparseable token.
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct JwtService {
    expires_in: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expires_in", &self.expires_in)
            .field("keys", &"[hidden]")
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Builds the keys and the validation rules once.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = config.leeway_secs;

        Self {
            expires_in: Duration::minutes(config.access_token_expires_minutes),
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        }
    }

    /// Mints an access token for `user_id` acting as `role`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Signing` if encoding fails.
    pub fn generate_access_token(&self, user_id: UserId, role: Role) -> Result<String, JwtError> {
        let claims = Claims::new(user_id, role, Utc::now() + self.expires_in);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Verifies a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` past `exp` (plus leeway) and
    /// `JwtError::Invalid` for anything else that fails verification.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }
}
