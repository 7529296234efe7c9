//! Bearer-token enforcement for protected routes.

use super::credentials::AdminCredentials;
use super::token::{Claims, TokenManager};
use crate::config::Config;
use crate::error::{AppError, UNAUTHORIZED};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenManager>,
    pub credentials: Arc<AdminCredentials>,
    pub config: Arc<Config>,
}

fn unauthorized() -> AppError {
    AppError::Unauthorized(UNAUTHORIZED.to_string())
}

/// Reject the request unless it carries a valid `Authorization: Bearer {token}`.
///
/// Every failure produces the same 401 body; the specific reason is only logged.
/// On success the verified [`Claims`] are stored in the request extensions for
/// [`AuthClaims`] and the request is otherwise passed through unchanged.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        tracing::debug!(
            action = "auth_rejected",
            reason = "missing_header",
            "Missing authorization header"
        );
        return Err(unauthorized());
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            tracing::debug!(
                action = "auth_rejected",
                reason = "bad_scheme",
                "Invalid authorization format"
            );
            unauthorized()
        })?;

    let claims = state.tokens.get_claims(token).map_err(|e| {
        tracing::info!(
            action = "auth_rejected",
            reason = e.kind(),
            error = %e,
            "Token verification failed"
        );
        unauthorized()
    })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Verified claims of the current request.
///
/// Only available behind [`require_auth`]; anywhere else it rejects with 401.
#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthClaims)
            .ok_or_else(unauthorized)
    }
}
