//! Signing keys and key providers.
//!
//! Tokens are signed with a shared HMAC secret. The secret is never compiled
//! in; it reaches the issuer through a [`KeyProvider`], normally a
//! [`KeyRing`] built from configuration. A key ring can be rotated at runtime:
//! the new key signs from then on, while retired keys keep verifying tokens
//! issued before the rotation until they fall out of the ring.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use crate::config::{ConfigError, SigningConfig};
use crate::token::TokenError;

/// Minimum accepted secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported HMAC signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
        }
    }

    /// Returns the algorithm name as used in JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
        }
    }
}

impl std::str::FromStr for SigningAlgorithm {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(TokenError::Signing(format!(
                "unsupported signing algorithm '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// A symmetric key with its identifier and algorithm.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Creates a key from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if the key id is empty or the secret is
    /// shorter than [`MIN_SECRET_LEN`] bytes.
    pub fn from_secret(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        secret: &[u8],
    ) -> Result<Self, TokenError> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            return Err(TokenError::Signing("key id cannot be empty".to_string()));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::Signing(format!(
                "secret for key '{}' must be at least {} bytes",
                kid, MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            kid,
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    #[must_use]
    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Key Provider
// ============================================================================

/// Source of signing and verification keys.
pub trait KeyProvider: Send + Sync {
    /// Key used to sign new tokens.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Signing` if no usable key is configured.
    fn signing_key(&self) -> Result<Arc<SigningKey>, TokenError>;

    /// Key matching a token's `kid` header; `None` kid selects the current key.
    fn verification_key(&self, kid: Option<&str>) -> Option<Arc<SigningKey>>;
}

#[derive(Debug)]
struct KeySet {
    current: Arc<SigningKey>,
    retired: Vec<Arc<SigningKey>>,
}

/// Current signing key plus retired keys still accepted for verification.
pub struct KeyRing {
    keys: ArcSwap<KeySet>,
    keys_to_keep: usize,
}

impl KeyRing {
    /// Creates a ring holding a single key.
    #[must_use]
    pub fn new(current: SigningKey, keys_to_keep: usize) -> Self {
        Self {
            keys: ArcSwap::from_pointee(KeySet {
                current: Arc::new(current),
                retired: Vec::new(),
            }),
            keys_to_keep,
        }
    }

    /// Builds the ring described by the signing configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the secret is missing, too short, or the
    /// algorithm is not supported.
    pub fn from_config(config: &SigningConfig) -> Result<Self, ConfigError> {
        let algorithm: SigningAlgorithm = config
            .algorithm
            .parse()
            .map_err(|e: TokenError| ConfigError::InvalidValue(e.to_string()))?;
        let secret = config.resolve_secret()?;
        let current = SigningKey::from_secret(&config.key_id, algorithm, secret.as_bytes())
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let retired = config
            .retired_keys
            .iter()
            .map(|k| {
                SigningKey::from_secret(&k.key_id, algorithm, k.secret.as_bytes())
                    .map(Arc::new)
                    .map_err(|e| ConfigError::InvalidValue(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ring = Self::new(current, config.keys_to_keep.max(retired.len()));
        ring.keys.rcu(|set| KeySet {
            current: set.current.clone(),
            retired: retired.clone(),
        });
        Ok(ring)
    }

    /// Makes `key` the signing key and retires the previous one.
    ///
    /// Retired keys beyond `keys_to_keep` are dropped, oldest first.
    pub fn rotate(&self, key: SigningKey) {
        let key = Arc::new(key);
        let keep = self.keys_to_keep;
        self.keys.rcu(|set| {
            let mut retired = Vec::with_capacity(keep);
            if keep > 0 {
                retired.push(set.current.clone());
                retired.extend(set.retired.iter().take(keep - 1).cloned());
            }
            KeySet {
                current: key.clone(),
                retired,
            }
        });
        tracing::info!(kid = %key.kid(), "Signing key rotated");
    }

    /// Identifier of the current signing key.
    #[must_use]
    pub fn current_kid(&self) -> String {
        self.keys.load().current.kid.clone()
    }

    /// Identifiers of the retired keys, newest first.
    #[must_use]
    pub fn retired_kids(&self) -> Vec<String> {
        self.keys
            .load()
            .retired
            .iter()
            .map(|k| k.kid.clone())
            .collect()
    }
}

impl KeyProvider for KeyRing {
    fn signing_key(&self) -> Result<Arc<SigningKey>, TokenError> {
        Ok(self.keys.load().current.clone())
    }

    fn verification_key(&self, kid: Option<&str>) -> Option<Arc<SigningKey>> {
        let set = self.keys.load();
        match kid {
            None => Some(set.current.clone()),
            Some(kid) if set.current.kid == kid => Some(set.current.clone()),
            Some(kid) => set.retired.iter().find(|k| k.kid == kid).cloned(),
        }
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("current", &self.current_kid())
            .field("retired", &self.retired_kids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetiredKey;

    const SECRET_A: &[u8] = b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SECRET_B: &[u8] = b"bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const SECRET_C: &[u8] = b"cccccccccccccccccccccccccccccccc";

    fn key(kid: &str, secret: &[u8]) -> SigningKey {
        SigningKey::from_secret(kid, SigningAlgorithm::HS256, secret).unwrap()
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = SigningKey::from_secret("k1", SigningAlgorithm::HS256, b"short").unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }

    #[test]
    fn test_empty_kid_rejected() {
        assert!(SigningKey::from_secret(" ", SigningAlgorithm::HS256, SECRET_A).is_err());
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!(
            "HS512".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::HS512
        );
        assert!("RS256".parse::<SigningAlgorithm>().is_err());
    }

    #[test]
    fn test_verification_key_lookup() {
        let ring = KeyRing::new(key("k1", SECRET_A), 2);
        assert_eq!(ring.verification_key(None).unwrap().kid(), "k1");
        assert_eq!(ring.verification_key(Some("k1")).unwrap().kid(), "k1");
        assert!(ring.verification_key(Some("k0")).is_none());
    }

    #[test]
    fn test_rotation_keeps_bounded_history() {
        let ring = KeyRing::new(key("k1", SECRET_A), 1);
        ring.rotate(key("k2", SECRET_B));
        assert_eq!(ring.current_kid(), "k2");
        assert_eq!(ring.retired_kids(), vec!["k1".to_string()]);
        assert!(ring.verification_key(Some("k1")).is_some());

        ring.rotate(key("k3", SECRET_C));
        assert_eq!(ring.current_kid(), "k3");
        assert_eq!(ring.retired_kids(), vec!["k2".to_string()]);
        assert!(ring.verification_key(Some("k1")).is_none());
    }

    #[test]
    fn test_from_config_with_retired_keys() {
        let config = SigningConfig {
            key_id: "2026-10".to_string(),
            secret: Some(String::from_utf8(SECRET_A.to_vec()).unwrap()),
            retired_keys: vec![RetiredKey {
                key_id: "2026-04".to_string(),
                secret: String::from_utf8(SECRET_B.to_vec()).unwrap(),
            }],
            ..Default::default()
        };
        let ring = KeyRing::from_config(&config).unwrap();
        assert_eq!(ring.current_kid(), "2026-10");
        assert_eq!(ring.retired_kids(), vec!["2026-04".to_string()]);
    }

    #[test]
    fn test_from_config_short_secret() {
        let config = SigningConfig {
            secret: Some("too-short".to_string()),
            ..Default::default()
        };
        let err = KeyRing::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_debug_hides_secret() {
        let rendered = format!("{:?}", key("k1", SECRET_A));
        assert!(rendered.contains("k1"));
        assert!(!rendered.contains("aaaa"));
    }
}
