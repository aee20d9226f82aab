//! Access and refresh token claim sets.
//!
//! Both claim sets carry the same identity fields (`username`, `role`,
//! `email`) and differ in lifetime and in the `token_type` discriminator.
//! Deriving one from the other keeps the identity and replaces only the
//! timestamps and the discriminator.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Token class discriminator embedded in every token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived bearer credential.
    AccessToken,
    /// Long-lived credential exchanged for a new access token.
    RefreshToken,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken => write!(f, "access_token"),
            Self::RefreshToken => write!(f, "refresh_token"),
        }
    }
}

/// Identity fields shared by every claim set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: String,
    pub email: String,
}

impl Identity {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        role: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            role: role.into(),
            email: email.into(),
        }
    }
}

/// Behaviour common to the claim sets the verifier can decode.
pub trait TypedClaims: serde::de::DeserializeOwned + Serialize + Clone {
    /// The discriminator every token of this class must carry.
    const TOKEN_TYPE: TokenType;

    /// Discriminator found in the decoded payload.
    fn token_type(&self) -> TokenType;

    /// Expiration as a Unix timestamp.
    fn expires_at(&self) -> i64;

    /// Returns `true` once `now` has reached the expiration time.
    fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at() <= now.unix_timestamp()
    }
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub username: String,
    pub role: String,
    pub email: String,
    pub token_type: TokenType,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl AccessClaims {
    /// Builds access claims for `identity` expiring `ttl` after `issued_at`.
    #[must_use]
    pub fn new(identity: Identity, issued_at: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            username: identity.username,
            role: identity.role,
            email: identity.email,
            token_type: TokenType::AccessToken,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + ttl).unix_timestamp(),
        }
    }

    /// Same identity with a fresh issue and expiry time.
    #[must_use]
    pub fn renewed(&self, issued_at: OffsetDateTime, ttl: Duration) -> Self {
        Self::new(self.identity(), issued_at, ttl)
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(&self.username, &self.role, &self.email)
    }
}

impl TypedClaims for AccessClaims {
    const TOKEN_TYPE: TokenType = TokenType::AccessToken;

    fn token_type(&self) -> TokenType {
        self.token_type
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Refresh token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub token_type: TokenType,
    pub username: String,
    pub role: String,
    pub email: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Unique token id so tokens minted in the same second differ.
    pub jti: String,
}

impl RefreshClaims {
    /// Builds refresh claims for `identity` expiring `ttl` after `issued_at`.
    #[must_use]
    pub fn new(identity: Identity, issued_at: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            token_type: TokenType::RefreshToken,
            username: identity.username,
            role: identity.role,
            email: identity.email,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + ttl).unix_timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(&self.username, &self.role, &self.email)
    }
}

impl TypedClaims for RefreshClaims {
    const TOKEN_TYPE: TokenType = TokenType::RefreshToken;

    fn token_type(&self) -> TokenType {
        self.token_type
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn alice() -> Identity {
        Identity::new("alice", "user", "alice@x.com")
    }

    #[test]
    fn test_access_claims_expiry() {
        let now = datetime!(2026-01-01 12:00 UTC);
        let claims = AccessClaims::new(alice(), now, Duration::from_secs(1800));
        assert_eq!(claims.iat, now.unix_timestamp());
        assert_eq!(claims.exp, now.unix_timestamp() + 1800);
        assert_eq!(claims.token_type, TokenType::AccessToken);
        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(datetime!(2026-01-01 12:30 UTC)));
    }

    #[test]
    fn test_refresh_derivation_preserves_identity() {
        let now = datetime!(2026-01-01 12:00 UTC);
        let access = AccessClaims::new(alice(), now, Duration::from_secs(60));
        let refresh =
            RefreshClaims::new(access.identity(), now, Duration::from_secs(30 * 24 * 3600));

        assert_eq!(refresh.identity(), access.identity());
        assert_eq!(refresh.token_type, TokenType::RefreshToken);
        assert_eq!(refresh.exp, now.unix_timestamp() + 30 * 24 * 3600);

        let later = datetime!(2026-01-05 08:00 UTC);
        let derived = AccessClaims::new(refresh.identity(), later, Duration::from_secs(60));
        assert_eq!(derived.identity(), alice());
        assert_eq!(derived.token_type, TokenType::AccessToken);
        assert_eq!(derived.iat, later.unix_timestamp());
    }

    #[test]
    fn test_renewed_changes_only_timestamps() {
        let now = datetime!(2026-01-01 12:00 UTC);
        let claims = AccessClaims::new(alice(), now, Duration::from_secs(60));
        let renewed = claims.renewed(datetime!(2026-01-01 13:00 UTC), Duration::from_secs(60));
        assert_eq!(renewed.identity(), claims.identity());
        assert_eq!(renewed.exp - claims.exp, 3600);
    }

    #[test]
    fn test_refresh_tokens_get_distinct_ids() {
        let now = datetime!(2026-01-01 12:00 UTC);
        let a = RefreshClaims::new(alice(), now, Duration::from_secs(60));
        let b = RefreshClaims::new(alice(), now, Duration::from_secs(60));
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wire_field_names() {
        let now = datetime!(2026-01-01 12:00 UTC);
        let refresh = RefreshClaims::new(alice(), now, Duration::from_secs(60));
        let value = serde_json::to_value(&refresh).unwrap();
        assert_eq!(value["token_type"], "refresh_token");
        assert_eq!(value["username"], "alice");
        assert_eq!(value["role"], "user");
        assert_eq!(value["email"], "alice@x.com");
        assert!(value["exp"].is_i64());

        let access = AccessClaims::new(alice(), now, Duration::from_secs(60));
        let value = serde_json::to_value(&access).unwrap();
        assert_eq!(value["token_type"], "access_token");
    }
}
