//! Bearer-token authentication.
//!
//! Handlers take an [`AuthUser`] argument; the extractor rejects the request
//! with 401 before any progress logic runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use progress_core::model::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("Not authenticated")]
    MissingCredentials,
    #[error("Invalid authentication credentials")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Invalid authentication credentials")]
    EmptySubject,
    #[error("failed to issue token: {0}")]
    Issue(#[source] jsonwebtoken::errors::Error),
    #[error("token lifetime out of range")]
    TtlOutOfRange,
}

/// Resolves a bearer token to the user it was issued for.
pub trait Authenticator: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError` if the token is malformed, expired or not trusted.
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 JWT authenticator. `sub` carries the user id; `exp` is mandatory.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a token for `user_id` that expires after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TtlOutOfRange` if `now + ttl` is not a valid
    /// instant, or `AuthError::Issue` if the token cannot be signed.
    pub fn issue(&self, user_id: &UserId, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .ok_or(AuthError::TtlOutOfRange)?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Issue)
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(AuthError::InvalidToken)?;
        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::EmptySubject);
        }
        Ok(UserId::new(data.claims.sub))
    }
}

/// The caller, as resolved from the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts).ok_or(AuthError::MissingCredentials)?;
        let id = state.auth.authenticate(token)?;
        Ok(Self { id })
    }
}
