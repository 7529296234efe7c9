//! API route handlers.

pub mod auth;

use crate::auth::middleware::{require_auth, AppState};
use crate::middleware::request_timeout;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    routing::post,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Build the API router with all endpoints.
///
/// Every route runs under the request timeout. Protected routes additionally sit
/// behind [`require_auth`], which is layered outside the timeout.
pub fn api_router(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/api/login", post(auth::login));

    let protected = Router::new()
        .route("/api/check", get(auth::check))
        .route("/api/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            request_timeout,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            request_timeout,
        ))
        .merge(protected)
}

/// CORS for browser clients on the listed origins.
///
/// Credentials are allowed, so origins are always an explicit list.
pub fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
