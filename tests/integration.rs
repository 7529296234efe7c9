//! Integration tests for the timeline-auth API.
//!
//! Each test spawns a server on an ephemeral port with a freshly generated key pair.

use axum::http::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use timeline_auth::{
    auth::{generate_keypair_pem, AdminCredentials, AppState, TokenManager},
    config::Config,
    models::{MeResponse, TokenResponse},
    routes,
};

const ADMIN_EMAIL: &str = "admin@timeline.test";
const ADMIN_PASS: &str = "correct horse battery staple";

/// Spin up a test server and return its base URL and token manager.
async fn spawn_test_server() -> (String, Arc<TokenManager>) {
    let (secret_key, public_key) = generate_keypair_pem().expect("Failed to generate keys");

    let config = Config {
        secret_key: secret_key.clone(),
        public_key: public_key.clone(),
        admin_email: ADMIN_EMAIL.to_string(),
        admin_password: ADMIN_PASS.to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        request_timeout: Duration::from_secs(5),
        cors_origins: vec![HeaderValue::from_static("http://localhost:3000")],
        token_ttl: Duration::from_secs(600),
    };

    let tokens = Arc::new(TokenManager::new(&secret_key, &public_key).expect("Invalid keys"));
    let state = AppState {
        tokens: tokens.clone(),
        credentials: Arc::new(AdminCredentials::new(ADMIN_EMAIL, ADMIN_PASS).unwrap()),
        config: Arc::new(config),
    };

    let cors = routes::cors_layer(&state.config.cors_origins);
    let app = routes::api_router(&state).layer(cors).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), tokens)
}

async fn login(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    password: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/login", base_url))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send request")
}

// ============================================================================
// Login Tests
// ============================================================================

#[tokio::test]
async fn test_login_then_access_protected_routes() {
    let (base_url, _tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = login(&client, &base_url, ADMIN_EMAIL, ADMIN_PASS).await;
    assert_eq!(resp.status(), 200);
    let issued: TokenResponse = resp.json().await.unwrap();
    assert_eq!(issued.token.split('.').count(), 3);

    let resp = client
        .get(format!("{}/api/check", base_url))
        .bearer_auth(&issued.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/me", base_url))
        .bearer_auth(&issued.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let me: MeResponse = resp.json().await.unwrap();
    assert_eq!(me.user, ADMIN_EMAIL);
    assert!(me.authorized);
    assert_eq!(me.expires_at, issued.expires_at);
}

#[tokio::test]
async fn test_login_wrong_credentials() {
    let (base_url, _tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = login(&client, &base_url, ADMIN_EMAIL, "wrong").await;
    assert_eq!(resp.status(), 401);

    let resp = login(&client, &base_url, "someone@else.test", ADMIN_PASS).await;
    assert_eq!(resp.status(), 401);
}

// ============================================================================
// Middleware Tests
// ============================================================================

#[tokio::test]
async fn test_missing_authorization_header() {
    let (base_url, _tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/check", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_token_from_other_server_rejected() {
    let (base_url, _tokens) = spawn_test_server().await;
    let (_other_url, other_tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let foreign = other_tokens.generate_token(ADMIN_EMAIL).unwrap();
    let resp = client
        .get(format!("{}/api/me", base_url))
        .bearer_auth(&foreign)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_tampered_token_rejected() {
    let (base_url, tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let token = tokens.generate_token(ADMIN_EMAIL).unwrap();
    let (body, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { "B" } else { "A" };
    let forged = format!("{}.{}{}", body, flipped, &signature[1..]);

    let resp = client
        .get(format!("{}/api/check", base_url))
        .bearer_auth(&forged)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_rejections_are_indistinguishable() {
    let (base_url, _tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let mut bodies = Vec::new();
    for value in ["", "Bearer ", "Bearer a.b.c", "Basic dXNlcjpwYXNz"] {
        let resp = client
            .get(format!("{}/api/check", base_url))
            .header("Authorization", value)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
        bodies.push(resp.text().await.unwrap());
    }
    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}

// ============================================================================
// CORS Tests
// ============================================================================

#[tokio::test]
async fn test_cors_preflight_allows_authorization() {
    let (base_url, _tokens) = spawn_test_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{}/api/me", base_url))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "authorization")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["access-control-allow-origin"],
        "http://localhost:3000"
    );
    assert_eq!(resp.headers()["access-control-allow-credentials"], "true");

    let resp = client
        .request(reqwest::Method::OPTIONS, format!("{}/api/me", base_url))
        .header("Origin", "https://elsewhere.test")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("access-control-allow-origin").is_none());
}
