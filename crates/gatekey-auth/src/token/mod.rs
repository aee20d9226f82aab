//! Token issuance and verification.
//!
//! - Claim sets for access and refresh tokens
//! - HMAC signing keys and the rotating key ring
//! - JWT encoding and decoding

pub mod claims;
pub mod jwt;
pub mod keys;

pub use claims::{AccessClaims, Identity, RefreshClaims, TokenType, TypedClaims};
pub use jwt::{TokenError, TokenIssuer, TokenState, TokenVerifier};
pub use keys::{KeyProvider, KeyRing, MIN_SECRET_LEN, SigningAlgorithm, SigningKey};
