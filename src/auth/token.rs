//! Issuance and verification of signed session tokens.
//!
//! Tokens use the compact `header.claims.signature` form, each segment base64url
//! encoded without padding. Nothing is stored server-side: a token is valid iff
//! its signature checks out against the configured public key, its header names
//! `EdDSA`, and its `exp` is strictly after the current clock reading.

use super::keys::{KeyFormatError, KeyMaterial};
use super::signing::{Key, SigningMethod};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(10 * 60);

/// Token issuance and verification failures.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("key is of invalid type")]
    InvalidKeyType,

    #[error("key is of invalid size: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("invalid token signing method: {0}")]
    InvalidSigningMethod(String),

    #[error("signature verification failed")]
    SignatureMismatch,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token is expired")]
    Expired,

    #[error("invalid token claims: {0}")]
    InvalidClaims(String),

    #[error("error signing token: {0}")]
    Signing(String),
}

impl TokenError {
    /// Stable short name, for logs only.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenError::InvalidKeyType => "invalid_key_type",
            TokenError::InvalidKeySize { .. } => "invalid_key_size",
            TokenError::InvalidSigningMethod(_) => "invalid_signing_method",
            TokenError::SignatureMismatch => "signature_mismatch",
            TokenError::Malformed(_) => "malformed",
            TokenError::Expired => "expired",
            TokenError::InvalidClaims(_) => "invalid_claims",
            TokenError::Signing(_) => "signing",
        }
    }
}

/// Source of the current time for expiry computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> SystemTime + Send + Sync,
{
    fn now(&self) -> SystemTime {
        self()
    }
}

/// Seconds since the epoch, negative before it.
fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => since.as_secs() as i64,
        Err(before) => -(before.duration().as_secs() as i64),
    }
}

/// Token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// Session claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub authorized: bool,
    /// Absolute expiry, seconds since the epoch.
    pub exp: i64,
    pub user: String,
}

impl TryFrom<Map<String, Value>> for Claims {
    type Error = TokenError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| TokenError::InvalidClaims(e.to_string()))
    }
}

/// A token whose algorithm and signature have been checked. Expiry has not.
#[derive(Debug, Clone)]
pub struct ParsedToken {
    pub raw: String,
    pub method: SigningMethod,
    pub header: Header,
    pub claims: Map<String, Value>,
    pub signature: String,
}

/// Owns the key pair and issues/verifies tokens with it.
pub struct TokenManager {
    keys: KeyMaterial,
    method: SigningMethod,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("keys", &self.keys)
            .field("method", &self.method)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenManager {
    /// Build a manager from PEM text. Fails if either key cannot be decoded.
    pub fn new(private_pem: &str, public_pem: &str) -> Result<Self, KeyFormatError> {
        Ok(Self::from_keys(KeyMaterial::from_pem(private_pem, public_pem)?))
    }

    pub fn from_keys(keys: KeyMaterial) -> Self {
        TokenManager {
            keys,
            method: SigningMethod::EdDsa,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Replace the clock used for issuance and expiry checks.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn public_key(&self) -> &[u8] {
        self.keys.public_key()
    }

    fn now(&self) -> i64 {
        unix_seconds(self.clock.now())
    }

    /// Issue a token for `subject`, valid for the configured TTL.
    ///
    /// Any failure while encoding or signing, panics included, is reported as
    /// [`TokenError::Signing`].
    pub fn generate_token(&self, subject: &str) -> Result<String, TokenError> {
        let signed = panic::catch_unwind(AssertUnwindSafe(|| {
            let claims = Claims {
                authorized: true,
                exp: self.expiry_from_now()?,
                user: subject.to_string(),
            };
            self.sign_claims(&claims)
        }))
        .unwrap_or_else(|payload| {
            Err(TokenError::Signing(format!(
                "signing panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        signed.map_err(|e| {
            tracing::warn!(error = %e, kind = e.kind(), "error signing token");
            match e {
                TokenError::Signing(_) => e,
                other => TokenError::Signing(other.to_string()),
            }
        })
    }

    fn expiry_from_now(&self) -> Result<i64, TokenError> {
        i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|ttl| self.now().checked_add(ttl))
            .ok_or_else(|| {
                TokenError::Signing(format!(
                    "token lifetime of {}s overflows the expiry timestamp",
                    self.ttl.as_secs()
                ))
            })
    }

    fn sign_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header {
            alg: self.method.alg().to_string(),
            typ: Some("JWT".to_string()),
        };
        let header = serde_json::to_vec(&header).map_err(|e| TokenError::Signing(e.to_string()))?;
        let claims = serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(claims)
        );
        let signature = self
            .method
            .sign(&signing_input, Key::Private(self.keys.private_seed()))?;

        Ok(format!("{}.{}", signing_input, signature))
    }

    /// Check structure, algorithm and signature. Expiry is not checked.
    pub fn parse_and_verify(&self, token: &str) -> Result<ParsedToken, TokenError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed(
                "token must have three segments".to_string(),
            ));
        };

        let header: Header = decode_segment(header_b64, "header")?;
        let method = SigningMethod::from_alg(&header.alg)?;
        if method != self.method {
            return Err(TokenError::InvalidSigningMethod(header.alg));
        }

        let claims: Map<String, Value> = decode_segment(claims_b64, "claims")?;

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        method.verify(signing_input, signature, Key::Public(self.keys.public_key()))?;

        Ok(ParsedToken {
            raw: token.to_string(),
            method,
            header,
            claims,
            signature: signature.to_string(),
        })
    }

    /// Verify a token and return its claims if it has not expired.
    pub fn get_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let parsed = self.parse_and_verify(token)?;
        let claims = Claims::try_from(parsed.claims)?;

        if claims.exp <= self.now() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{} segment: {}", name, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("{} segment: {}", name, e)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
