//! PEM/DER key loading for the token signer.
//!
//! Only one key profile is understood: an Ed25519 PKCS#8 v1 private key and an
//! SPKI public key, as produced by `openssl genpkey -algorithm ed25519`:
//!
//! ```text
//! private: 30 2e 02 01 00 30 05 06 03 2b 65 70 04 22 | 04 20 <32-byte seed>
//! public:  30 2a 30 05 06 03 2b 65 70 03 21 00 <32-byte point>
//! ```
//!
//! The private octet string wraps a second `OCTET STRING` header (`04 20`) which is
//! skipped positionally. The algorithm OID is shape-checked but not enforced, so a
//! foreign key (e.g. RSA) still loads and is rejected later by the signer.

use der::asn1::{Any, BitString, ObjectIdentifier, OctetString};
use der::{Decode, Encode, Sequence};
use ed25519_dalek::SigningKey;
use std::fmt;
use zeroize::Zeroizing;

/// `id-Ed25519` from RFC 8410.
pub const ED25519_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Length of the nested `OCTET STRING` header in front of the seed.
const SEED_HEADER_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Private,
    Public,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Private => f.write_str("private"),
            KeyKind::Public => f.write_str("public"),
        }
    }
}

/// Key material could not be decoded. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum KeyFormatError {
    #[error("invalid {kind} key format: {source}")]
    Pem {
        kind: KeyKind,
        #[source]
        source: pem::PemError,
    },

    #[error("invalid {kind} key structure: {source}")]
    Asn1 {
        kind: KeyKind,
        #[source]
        source: der::Error,
    },

    #[error("private key octet string too short: {0} bytes")]
    TruncatedSeed(usize),
}

#[derive(Sequence)]
struct AlgorithmIdentifier {
    algorithm: ObjectIdentifier,
    parameters: Option<Any>,
}

#[derive(Sequence)]
struct PrivateKeyInfo {
    version: u8,
    algorithm: AlgorithmIdentifier,
    private_key: OctetString,
}

#[derive(Sequence)]
struct SubjectPublicKeyInfo {
    algorithm: AlgorithmIdentifier,
    subject_public_key: BitString,
}

/// Raw key bytes owned by the token manager.
#[derive(Clone)]
pub struct KeyMaterial {
    private_seed: Zeroizing<Vec<u8>>,
    public_key: Vec<u8>,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_seed", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl KeyMaterial {
    /// Decode both halves of a key pair from PEM text.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> Result<Self, KeyFormatError> {
        Ok(KeyMaterial {
            private_seed: decode_private_key(private_pem)?,
            public_key: decode_public_key(public_pem)?,
        })
    }

    pub fn private_seed(&self) -> &[u8] {
        &self.private_seed
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Extract the raw seed from a PKCS#8 PEM block.
///
/// The seed length is not checked here; the signer reports a wrong size.
pub fn decode_private_key(pem_text: &str) -> Result<Zeroizing<Vec<u8>>, KeyFormatError> {
    let block = pem::parse(pem_text).map_err(|source| KeyFormatError::Pem {
        kind: KeyKind::Private,
        source,
    })?;
    let info = PrivateKeyInfo::from_der(block.contents()).map_err(|source| {
        KeyFormatError::Asn1 {
            kind: KeyKind::Private,
            source,
        }
    })?;

    let octets = Zeroizing::new(info.private_key.as_bytes().to_vec());
    if octets.len() < SEED_HEADER_LEN {
        return Err(KeyFormatError::TruncatedSeed(octets.len()));
    }

    Ok(Zeroizing::new(octets[SEED_HEADER_LEN..].to_vec()))
}

/// Extract the raw public point from an SPKI PEM block.
pub fn decode_public_key(pem_text: &str) -> Result<Vec<u8>, KeyFormatError> {
    let block = pem::parse(pem_text).map_err(|source| KeyFormatError::Pem {
        kind: KeyKind::Public,
        source,
    })?;
    let info = SubjectPublicKeyInfo::from_der(block.contents()).map_err(|source| {
        KeyFormatError::Asn1 {
            kind: KeyKind::Public,
            source,
        }
    })?;

    Ok(info.subject_public_key.raw_bytes().to_vec())
}

/// Encode an Ed25519 seed as a `(private, public)` PEM pair in the profile
/// [`decode_private_key`] and [`decode_public_key`] accept.
pub fn encode_keypair_pem(seed: &[u8; 32]) -> Result<(String, String), der::Error> {
    let public = SigningKey::from_bytes(seed).verifying_key().to_bytes();

    let mut wrapped = Zeroizing::new(Vec::with_capacity(SEED_HEADER_LEN + seed.len()));
    wrapped.extend_from_slice(&[0x04, 0x20]);
    wrapped.extend_from_slice(seed);

    let private_der = Zeroizing::new(
        PrivateKeyInfo {
            version: 0,
            algorithm: AlgorithmIdentifier {
                algorithm: ED25519_OID,
                parameters: None,
            },
            private_key: OctetString::new(wrapped.to_vec())?,
        }
        .to_der()?,
    );
    let public_der = SubjectPublicKeyInfo {
        algorithm: AlgorithmIdentifier {
            algorithm: ED25519_OID,
            parameters: None,
        },
        subject_public_key: BitString::from_bytes(&public)?,
    }
    .to_der()?;

    Ok((
        pem::encode(&pem::Pem::new("PRIVATE KEY", private_der.to_vec())),
        pem::encode(&pem::Pem::new("PUBLIC KEY", public_der)),
    ))
}

/// Generate a fresh random Ed25519 key pair as PEM text.
pub fn generate_keypair_pem() -> Result<(String, String), der::Error> {
    let mut seed = Zeroizing::new([0u8; 32]);
    rand::fill(&mut seed[..]);
    encode_keypair_pem(&seed)
}
