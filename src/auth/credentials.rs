//! The administrator credential checked at login.
//!
//! The password is never kept in memory: it is stretched once at startup with
//! Argon2id under a random per-process salt, and login attempts are compared
//! against that digest.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

const DIGEST_LEN: usize = 32;
const SALT_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct CredentialError(String);

pub struct AdminCredentials {
    email: String,
    salt: [u8; SALT_LEN],
    digest: Zeroizing<[u8; DIGEST_LEN]>,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("digest", &"[REDACTED]")
            .finish()
    }
}

fn hasher() -> Result<Argon2<'static>, CredentialError> {
    // OWASP recommended Argon2id params: m=19456 (19MB), t=2, p=1
    let params = Params::new(19456, 2, 1, Some(DIGEST_LEN))
        .map_err(|e| CredentialError(format!("Argon2 params: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

impl AdminCredentials {
    pub fn new(email: &str, password: &str) -> Result<Self, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        rand::fill(&mut salt);

        let digest = derive(password, &salt)?;

        Ok(AdminCredentials {
            email: email.to_string(),
            salt,
            digest,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Check a login attempt. Hashing failures count as a mismatch.
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let candidate = match derive(password, &self.salt) {
            Ok(digest) => digest,
            Err(e) => {
                tracing::error!(error = %e, "Credential check failed");
                return false;
            }
        };

        // Both kinds of mismatch go through a full hash.
        email == self.email && *candidate == *self.digest
    }
}

fn derive(password: &str, salt: &[u8]) -> Result<Zeroizing<[u8; DIGEST_LEN]>, CredentialError> {
    let mut digest = Zeroizing::new([0u8; DIGEST_LEN]);
    hasher()?
        .hash_password_into(password.as_bytes(), salt, &mut digest[..])
        .map_err(|e| CredentialError(format!("Argon2 hash: {}", e)))?;
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_credentials() {
        let creds = AdminCredentials::new("admin@example.com", "hunter2").unwrap();

        assert!(creds.verify("admin@example.com", "hunter2"));
        assert!(!creds.verify("admin@example.com", "hunter3"));
        assert!(!creds.verify("other@example.com", "hunter2"));
        assert!(!creds.verify("", ""));
    }

    #[test]
    fn test_salt_is_random() {
        let a = AdminCredentials::new("a@example.com", "same").unwrap();
        let b = AdminCredentials::new("a@example.com", "same").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(*a.digest, *b.digest);
    }

    #[test]
    fn test_debug_redacts_digest() {
        let creds = AdminCredentials::new("admin@example.com", "hunter2").unwrap();
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin@example.com"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}
