//! Per-request timeout middleware.

use crate::auth::middleware::AppState;
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Bound how long the inner service may run.
///
/// On protected routes this sits inside [`require_auth`](crate::auth::require_auth),
/// so rejected requests never start the clock.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::{middleware, routing::get, Router};
/// use timeline_auth::{auth::AppState, middleware::request_timeout};
///
/// fn router(state: AppState) -> Router<AppState> {
///     Router::new()
///         .route("/", get(|| async { "ok" }))
///         .route_layer(middleware::from_fn_with_state(state, request_timeout))
/// }
/// ```
pub async fn request_timeout(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let timeout = state.config.request_timeout;

    tokio::time::timeout(timeout, next.run(request))
        .await
        .map_err(|_| {
            tracing::warn!(timeout_secs = timeout.as_secs_f64(), "Request timed out");
            AppError::TimedOut
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::fixtures::test_state;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/fast", get(|| async { "done" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "too late"
                }),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), request_timeout))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_fast_handler_passes() {
        let state = test_state(Duration::from_secs(5));
        let response = app(state)
            .oneshot(Request::builder().uri("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, "done");
    }

    #[tokio::test]
    async fn test_slow_handler_times_out() {
        let state = test_state(Duration::from_millis(50));
        let response = app(state)
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Timed out");
    }
}
