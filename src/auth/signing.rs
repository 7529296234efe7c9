//! The EdDSA signing method used for session tokens.

use super::token::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// Ed25519 seed length.
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Ed25519 public point length.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Key handed to [`SigningMethod::sign`] or [`SigningMethod::verify`].
#[derive(Debug, Clone, Copy)]
pub enum Key<'a> {
    /// Raw seed bytes.
    Private(&'a [u8]),
    /// Raw public point bytes.
    Public(&'a [u8]),
}

/// Signing algorithms accepted in a token header.
///
/// Exactly one scheme is supported. Anything else named in a header is rejected
/// by [`SigningMethod::from_alg`] before a signature is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMethod {
    EdDsa,
}

impl SigningMethod {
    /// The `alg` header value for this method.
    pub const fn alg(self) -> &'static str {
        match self {
            SigningMethod::EdDsa => "EdDSA",
        }
    }

    /// Resolve a header `alg` value. The match is exact and case-sensitive.
    pub fn from_alg(alg: &str) -> Result<Self, TokenError> {
        match alg {
            "EdDSA" => Ok(SigningMethod::EdDsa),
            other => Err(TokenError::InvalidSigningMethod(other.to_string())),
        }
    }

    /// Sign `signing_input` and return the base64url (unpadded) signature segment.
    pub fn sign(self, signing_input: &str, key: Key<'_>) -> Result<String, TokenError> {
        let Key::Private(seed) = key else {
            return Err(TokenError::InvalidKeyType);
        };
        let seed: &[u8; PRIVATE_KEY_SIZE] =
            seed.try_into().map_err(|_| TokenError::InvalidKeySize {
                expected: PRIVATE_KEY_SIZE,
                actual: seed.len(),
            })?;

        let signing_key = SigningKey::from_bytes(seed);
        let signature = signing_key.sign(signing_input.as_bytes());

        Ok(URL_SAFE_NO_PAD.encode(signature.to_bytes()))
    }

    /// Check a base64url signature segment over `signing_input`.
    pub fn verify(
        self,
        signing_input: &str,
        signature: &str,
        key: Key<'_>,
    ) -> Result<(), TokenError> {
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("signature segment: {}", e)))?;

        let Key::Public(point) = key else {
            return Err(TokenError::InvalidKeyType);
        };
        let point: &[u8; PUBLIC_KEY_SIZE] =
            point.try_into().map_err(|_| TokenError::InvalidKeySize {
                expected: PUBLIC_KEY_SIZE,
                actual: point.len(),
            })?;

        let verifying_key =
            VerifyingKey::from_bytes(point).map_err(|_| TokenError::InvalidKeyType)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| TokenError::SignatureMismatch)?;

        verifying_key
            .verify(signing_input.as_bytes(), &signature)
            .map_err(|_| TokenError::SignatureMismatch)
    }
}
