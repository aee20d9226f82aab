//! Refresh token storage trait.
//!
//! The store answers a single question for the refresh flow: was this refresh
//! token issued by us? It keeps no expiry or owner of its own; the token's
//! embedded claims carry both.
//!
//! # Security Considerations
//!
//! - Backends should persist [`hash_refresh_token`] digests, not raw tokens
//! - Tokens are never rotated or deleted on use

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::AuthResult;

/// Storage trait for issued refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Records an issued refresh token.
    ///
    /// Saving a token that is already present succeeds without change.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, token: &str) -> AuthResult<()>;

    /// Returns `true` if the token was previously saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn exists(&self, token: &str) -> AuthResult<bool>;
}

/// SHA-256 digest of a refresh token, hex encoded.
#[must_use]
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
