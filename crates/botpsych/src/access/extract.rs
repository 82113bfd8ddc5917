use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::domain::Principal;
use super::service::{AccessError, Authenticator};

/// Shared handle layered onto the router as an `Extension`.
pub type SharedAuthenticator = Arc<dyn Authenticator>;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let authenticator = parts
            .extensions
            .get::<SharedAuthenticator>()
            .cloned()
            .ok_or_else(|| {
                AccessError::Unauthorized("authentication is not configured".to_string())
            })?;
        let token = bearer_token(parts)
            .ok_or_else(|| AccessError::Unauthorized("Not authorized, no token".to_string()))?;

        authenticator.authenticate(token)
    }
}
