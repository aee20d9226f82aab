//! JWT issuance and verification.
//!
//! Tokens are compact JWS strings signed with an HMAC key taken from a
//! [`KeyProvider`]. The header carries the key id so that tokens signed before
//! a key rotation keep verifying.
//!
//! ## Example
//!
//! ```ignore
//! use gatekey_auth::token::{Identity, KeyRing, TokenIssuer, TokenVerifier};
//!
//! let keys = Arc::new(KeyRing::from_config(&config.signing)?);
//! let issuer = TokenIssuer::new(keys.clone(), &config.tokens);
//! let verifier = TokenVerifier::new(keys);
//!
//! let token = issuer.new_access_token(&identity, OffsetDateTime::now_utc())?;
//! let claims = verifier.parse_access(&token, OffsetDateTime::now_utc())?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use serde::Serialize;
use time::OffsetDateTime;

use crate::config::TokenConfig;
use crate::token::claims::{AccessClaims, Identity, RefreshClaims, TypedClaims};
use crate::token::keys::KeyProvider;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while issuing or parsing a token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token is not a well-formed JWS or carries unexpected claims.
    #[error("malformed token")]
    Malformed,

    /// The signature does not verify against any known key.
    #[error("invalid token signature")]
    SignatureInvalid,

    /// The signature is valid but the token has expired.
    #[error("token expired")]
    Expired,

    /// A token could not be signed.
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::SignatureInvalid,
            _ => Self::Malformed,
        }
    }
}

/// A decoded token with a valid signature, expired or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState<C> {
    /// The token has not expired yet.
    Active(C),
    /// The token has expired; its claims are still trustworthy.
    Expired(C),
}

// ============================================================================
// Issuer
// ============================================================================

/// Mints signed access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<dyn KeyProvider>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer with the lifetimes from `config`.
    #[must_use]
    pub fn new(keys: Arc<dyn KeyProvider>, config: &TokenConfig) -> Self {
        Self {
            keys,
            access_ttl: config.access_token_lifetime,
            refresh_ttl: config.refresh_token_lifetime,
        }
    }

    #[must_use]
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    #[must_use]
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Builds the access claims this issuer would sign for `identity` at `now`.
    #[must_use]
    pub fn access_claims(&self, identity: Identity, now: OffsetDateTime) -> AccessClaims {
        AccessClaims::new(identity, now, self.access_ttl)
    }

    /// Builds the refresh claims this issuer would sign for `identity` at `now`.
    #[must_use]
    pub fn refresh_claims(&self, identity: Identity, now: OffsetDateTime) -> RefreshClaims {
        RefreshClaims::new(identity, now, self.refresh_ttl)
    }

    /// Signs a new access token expiring one access lifetime after `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` on key misconfiguration.
    pub fn new_access_token(
        &self,
        identity: &Identity,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        self.sign(&self.access_claims(identity.clone(), now))
    }

    /// Signs a new refresh token expiring one refresh lifetime after `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` on key misconfiguration.
    pub fn new_refresh_token(
        &self,
        identity: &Identity,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        self.sign(&self.refresh_claims(identity.clone(), now))
    }

    /// Signs arbitrary claims with the current key.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if no key is available or encoding fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        let key = self.keys.signing_key()?;
        let mut header = Header::new(key.algorithm().to_jwt_algorithm());
        header.kid = Some(key.kid().to_string());

        encode(&header, claims, key.encoding_key()).map_err(|e| TokenError::Signing(e.to_string()))
    }
}

// ============================================================================
// Verifier
// ============================================================================

/// Parses tokens and checks signature and expiry.
///
/// Parsing is pure: it never touches a store and never looks at roles.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<dyn KeyProvider>,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// Decodes a token and reports whether it has expired at `now`.
    ///
    /// # Errors
    ///
    /// - `TokenError::Malformed` if the token cannot be decoded or belongs to
    ///   another token class.
    /// - `TokenError::SignatureInvalid` if the signature does not verify or the
    ///   key id is unknown.
    pub fn inspect<C: TypedClaims>(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<TokenState<C>, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        let key = self
            .keys
            .verification_key(header.kid.as_deref())
            .ok_or(TokenError::SignatureInvalid)?;

        let mut validation = Validation::new(key.algorithm().to_jwt_algorithm());
        // Expiry is checked below against the caller's clock, without leeway.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let data = decode::<C>(token, key.decoding_key(), &validation)?;
        let claims = data.claims;
        if claims.token_type() != C::TOKEN_TYPE {
            return Err(TokenError::Malformed);
        }

        if claims.is_expired_at(now) {
            Ok(TokenState::Expired(claims))
        } else {
            Ok(TokenState::Active(claims))
        }
    }

    /// Decodes a token that must be valid and unexpired at `now`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::inspect`], plus `TokenError::Expired`.
    pub fn parse<C: TypedClaims>(&self, token: &str, now: OffsetDateTime) -> Result<C, TokenError> {
        match self.inspect(token, now)? {
            TokenState::Active(claims) => Ok(claims),
            TokenState::Expired(_) => Err(TokenError::Expired),
        }
    }

    /// Parses an access token.
    ///
    /// # Errors
    ///
    /// See [`Self::parse`].
    pub fn parse_access(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<AccessClaims, TokenError> {
        self.parse(token, now)
    }

    /// Parses a refresh token.
    ///
    /// # Errors
    ///
    /// See [`Self::parse`].
    pub fn parse_refresh(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<RefreshClaims, TokenError> {
        self.parse(token, now)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::claims::TokenType;
    use crate::token::keys::{KeyRing, SigningAlgorithm, SigningKey};
    use time::macros::datetime;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    const OTHER_SECRET: &[u8] = b"fedcba9876543210fedcba9876543210";

    fn ring(kid: &str, secret: &[u8]) -> Arc<KeyRing> {
        Arc::new(KeyRing::new(
            SigningKey::from_secret(kid, SigningAlgorithm::HS256, secret).unwrap(),
            2,
        ))
    }

    fn pair(keys: Arc<KeyRing>) -> (TokenIssuer, TokenVerifier) {
        (
            TokenIssuer::new(keys.clone(), &TokenConfig::default()),
            TokenVerifier::new(keys),
        )
    }

    fn alice() -> Identity {
        Identity::new("alice", "user", "alice@x.com")
    }

    const NOW: OffsetDateTime = datetime!(2026-03-01 09:00 UTC);

    #[test]
    fn test_access_token_roundtrip() {
        let (issuer, verifier) = pair(ring("k1", SECRET));
        let token = issuer.new_access_token(&alice(), NOW).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let claims = verifier.parse_access(&token, NOW).unwrap();
        assert_eq!(claims.identity(), alice());
        assert_eq!(claims.exp, NOW.unix_timestamp() + 1800);
    }

    #[test]
    fn test_expired_access_token() {
        let (issuer, verifier) = pair(ring("k1", SECRET));
        let token = issuer.new_access_token(&alice(), NOW).unwrap();
        let later = NOW + Duration::from_secs(1800);

        assert_eq!(
            verifier.parse_access(&token, later).unwrap_err(),
            TokenError::Expired
        );

        match verifier.inspect::<AccessClaims>(&token, later).unwrap() {
            TokenState::Expired(claims) => assert_eq!(claims.username, "alice"),
            TokenState::Active(_) => panic!("token should be expired"),
        }
    }

    #[test]
    fn test_one_second_before_expiry_is_active() {
        let (issuer, verifier) = pair(ring("k1", SECRET));
        let token = issuer.new_access_token(&alice(), NOW).unwrap();
        let almost = NOW + Duration::from_secs(1799);
        assert!(verifier.parse_access(&token, almost).is_ok());
    }

    #[test]
    fn test_forged_signature() {
        let (issuer, _) = pair(ring("k1", OTHER_SECRET));
        let (_, verifier) = pair(ring("k1", SECRET));
        let token = issuer.new_access_token(&alice(), NOW).unwrap();

        assert_eq!(
            verifier.parse_access(&token, NOW).unwrap_err(),
            TokenError::SignatureInvalid
        );
        // Expired forged tokens still report the signature problem.
        let later = NOW + Duration::from_secs(7200);
        assert_eq!(
            verifier.inspect::<AccessClaims>(&token, later).unwrap_err(),
            TokenError::SignatureInvalid
        );
    }

    #[test]
    fn test_unknown_kid() {
        let (issuer, _) = pair(ring("other", SECRET));
        let (_, verifier) = pair(ring("k1", SECRET));
        let token = issuer.new_access_token(&alice(), NOW).unwrap();
        assert_eq!(
            verifier.parse_access(&token, NOW).unwrap_err(),
            TokenError::SignatureInvalid
        );
    }

    #[test]
    fn test_malformed_token() {
        let (_, verifier) = pair(ring("k1", SECRET));
        for token in ["", "not-a-token", "a.b.c", "eyJhbGciOiJIUzI1NiJ9.e30"] {
            assert_eq!(
                verifier.parse_access(token, NOW).unwrap_err(),
                TokenError::Malformed,
                "token {:?}",
                token
            );
        }
    }

    #[test]
    fn test_token_class_is_enforced() {
        let (issuer, verifier) = pair(ring("k1", SECRET));
        let refresh = issuer.new_refresh_token(&alice(), NOW).unwrap();
        let access = issuer.new_access_token(&alice(), NOW).unwrap();

        assert_eq!(
            verifier.parse_access(&refresh, NOW).unwrap_err(),
            TokenError::Malformed
        );
        assert_eq!(
            verifier.parse_refresh(&access, NOW).unwrap_err(),
            TokenError::Malformed
        );

        let claims = verifier.parse_refresh(&refresh, NOW).unwrap();
        assert_eq!(claims.token_type, TokenType::RefreshToken);
        assert_eq!(claims.exp, NOW.unix_timestamp() + 30 * 24 * 3600);
    }

    #[test]
    fn test_rotation_keeps_old_tokens_valid() {
        let keys = ring("k1", SECRET);
        let (issuer, verifier) = pair(keys.clone());
        let old = issuer.new_access_token(&alice(), NOW).unwrap();

        keys.rotate(SigningKey::from_secret("k2", SigningAlgorithm::HS256, OTHER_SECRET).unwrap());
        let new = issuer.new_access_token(&alice(), NOW).unwrap();

        let header = decode_header(&new).unwrap();
        assert_eq!(header.kid.as_deref(), Some("k2"));
        assert!(verifier.parse_access(&old, NOW).is_ok());
        assert!(verifier.parse_access(&new, NOW).is_ok());
    }
}
