use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use super::{
    claims::TokenKind,
    jwt::{JwtKeys, TokenError},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Identity of the caller, taken from a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Reads the `Bearer` token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Access token is required"))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid token format"))
}

pub fn authenticate(keys: &JwtKeys, headers: &HeaderMap) -> AppResult<AuthUser> {
    let token = bearer_token(headers)?;
    let claims = keys.verify(token, TokenKind::Access).map_err(|e| {
        warn!(error = %e, "access token rejected");
        match e {
            TokenError::Expired => AppError::forbidden("Access token expired"),
            TokenError::Invalid => AppError::unauthorized("Invalid access token"),
        }
    })?;
    Ok(AuthUser {
        id: claims.sub,
        email: claims.email,
    })
}

/// Gate for protected routes: verifies the access token and stores [`AuthUser`]
/// in the request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let keys = JwtKeys::from_ref(&state);
    let user = authenticate(&keys, request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Access token is required"))
    }
}
