//! Request and response models for the API.

use serde::{Deserialize, Serialize};

/// Login credentials.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    /// Seconds since the epoch.
    pub expires_at: i64,
}

/// Identity behind the presented token.
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: String,
    pub authorized: bool,
    pub expires_at: i64,
}
