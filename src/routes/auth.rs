//! Auth API endpoints.

use crate::auth::middleware::{AppState, AuthClaims};
use crate::error::{AppError, UNAUTHORIZED};
use crate::models::{LoginRequest, MeResponse, TokenResponse};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// POST /api/login - Exchange admin credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }
    let email = req.email.clone();

    // Argon2 is CPU-bound; keep it off the async workers
    let credentials = state.credentials.clone();
    let valid = tokio::task::spawn_blocking(move || credentials.verify(&req.email, &req.password))
        .await
        .map_err(|e| AppError::Internal(format!("Credential check failed: {}", e)))?;

    if !valid {
        tracing::warn!(action = "login_failed", email = %email, "Invalid credentials");
        return Err(AppError::Unauthorized(UNAUTHORIZED.to_string()));
    }

    let token = state.tokens.generate_token(&email)?;
    let claims = state.tokens.get_claims(&token).map_err(|e| {
        AppError::Internal(format!("Issued token failed verification: {}", e))
    })?;

    tracing::info!(action = "login_success", email = %email, exp = claims.exp, "Token issued");

    Ok(Json(TokenResponse {
        token,
        expires_at: claims.exp,
    }))
}

/// GET /api/check - 200 if the presented token is valid
pub async fn check() -> StatusCode {
    StatusCode::OK
}

/// GET /api/me - Claims of the presented token
pub async fn me(AuthClaims(claims): AuthClaims) -> Json<MeResponse> {
    Json(MeResponse {
        user: claims.user,
        authorized: claims.authorized,
        expires_at: claims.exp,
    })
}
