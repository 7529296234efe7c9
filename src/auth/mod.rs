//! Token authentication: key loading, the EdDSA signing method, token issuance and
//! verification, and the axum layer that enforces it.

pub mod credentials;
pub mod keys;
pub mod middleware;
pub mod signing;
pub mod token;

pub use credentials::AdminCredentials;
pub use keys::{generate_keypair_pem, KeyFormatError, KeyMaterial};
pub use middleware::{require_auth, AppState, AuthClaims};
pub use signing::{Key, SigningMethod};
pub use token::{Claims, Clock, ParsedToken, SystemClock, TokenError, TokenManager};
