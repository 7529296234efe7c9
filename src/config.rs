use axum::http::HeaderValue;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Upper bound for `TOKEN_TTL_SECS` (one year).
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

#[derive(Clone)]
pub struct Config {
    // Token signing keys (PEM)
    pub secret_key: String,
    pub public_key: String,

    // Admin identity
    pub admin_email: String,
    pub admin_password: String,

    // Server
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub cors_origins: Vec<HeaderValue>,

    // Tokens
    pub token_ttl: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &"[REDACTED]")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout", &self.request_timeout)
            .field("cors_origins", &self.cors_origins)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        let secret_key = required_pem("SECRET_KEY")?;
        let public_key = required_pem("PUBLIC_KEY")?;

        let admin_email = required_non_empty("ADMIN_EMAIL")?;
        let admin_password = required_non_empty("ADMIN_PASS")?;

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let request_timeout = Duration::from_secs(positive_secs("SERVER_TIMEOUT", 30)?);
        let cors_origins = cors_origins("CORS_ORIGINS")?;

        let token_ttl_secs = positive_secs("TOKEN_TTL_SECS", 600)?;
        if token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_SECS".to_string(),
                format!("must be at most {} seconds", MAX_TOKEN_TTL_SECS),
            ));
        }
        let token_ttl = Duration::from_secs(token_ttl_secs);

        Ok(Config {
            secret_key,
            public_key,
            admin_email,
            admin_password,
            bind_addr,
            request_timeout,
            cors_origins,
            token_ttl,
        })
    }
}

fn required_non_empty(key: &str) -> Result<String, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "cannot be empty".to_string(),
        ));
    }
    Ok(value)
}

/// PEM text may arrive on one line with literal `\n` escapes.
fn required_pem(key: &str) -> Result<String, ConfigError> {
    let value = required_non_empty(key)?.replace("\\n", "\n");
    if !value.contains("-----BEGIN ") {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "expected a PEM block".to_string(),
        ));
    }
    Ok(value)
}

/// Comma-separated list of exact origins allowed to make credentialed requests.
fn cors_origins(key: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    let raw = env::var(key).unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string());

    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            // A wildcard cannot be combined with credentials.
            if origin == "*" {
                return Err(ConfigError::InvalidValue(
                    key.to_string(),
                    "wildcard origin is not allowed".to_string(),
                ));
            }
            HeaderValue::from_str(origin).map_err(|e| {
                ConfigError::ParseError(key.to_string(), format!("{}: {}", e, origin))
            })
        })
        .collect()
}

fn positive_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    let secs = parse_env_or_default(key, default)?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(secs)
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
