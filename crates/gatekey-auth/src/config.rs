//! Authentication and authorization configuration.
//!
//! Token lifetimes, signing keys, verification-code policy, call deadlines and
//! the static role/route map all live here. Durations use humantime notation
//! (`"30m"`, `"30d"`).

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root authentication and authorization configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth.tokens]
/// access_token_lifetime = "30m"
/// refresh_token_lifetime = "30d"
///
/// [auth.signing]
/// algorithm = "HS256"
/// key_id = "2026-10"
/// secret_env = "GATEKEY_SIGNING_SECRET"
///
/// [auth.authorization.roles]
/// admin = ["GetAllUsers", "GetUser"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token lifetimes.
    pub tokens: TokenConfig,

    /// Token signing keys.
    pub signing: SigningConfig,

    /// Verification code policy.
    pub verification: VerificationConfig,

    /// Deadlines applied to store and mail calls.
    pub deadlines: DeadlineConfig,

    /// Password rules applied on registration and reset.
    pub password: PasswordConfig,

    /// Role permissions and identity binding.
    pub authorization: AuthorizationConfig,

    /// Self-registration rules.
    pub registration: RegistrationConfig,
}

/// Shortest accepted token lifetime; expiry has one-second resolution.
pub const MIN_TOKEN_LIFETIME: Duration = Duration::from_secs(1);

/// Longest accepted token lifetime.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(366 * 24 * 3600);

/// Token lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(30 * 60),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

/// A retired signing key still accepted for verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetiredKey {
    /// Key identifier carried in the token `kid` header.
    pub key_id: String,
    /// Shared secret.
    pub secret: String,
}

/// Token signing configuration.
///
/// The secret is read from `secret` when set, otherwise from the environment
/// variable named by `secret_env`.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// HMAC algorithm: "HS256", "HS384" or "HS512".
    pub algorithm: String,

    /// Identifier of the current key.
    pub key_id: String,

    /// Inline secret. Prefer `secret_env` outside of development.
    pub secret: Option<String>,

    /// Environment variable holding the secret.
    pub secret_env: String,

    /// Previous keys accepted for verification after a rotation.
    pub retired_keys: Vec<RetiredKey>,

    /// Number of retired keys kept when rotating at runtime.
    pub keys_to_keep: usize,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            key_id: "primary".to_string(),
            secret: None,
            secret_env: "GATEKEY_SIGNING_SECRET".to_string(),
            retired_keys: Vec::new(),
            keys_to_keep: 3,
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_env", &self.secret_env)
            .field("retired_keys", &self.retired_keys.len())
            .field("keys_to_keep", &self.keys_to_keep)
            .finish()
    }
}

impl SigningConfig {
    /// Resolves the current secret from the inline value or the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither source provides a secret.
    pub fn resolve_secret(&self) -> Result<String, ConfigError> {
        if let Some(secret) = self.secret.as_ref().filter(|s| !s.is_empty()) {
            return Ok(secret.clone());
        }
        std::env::var(&self.secret_env)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConfigError::Missing(format!(
                    "signing secret (set auth.signing.secret or ${})",
                    self.secret_env
                ))
            })
    }
}

/// Format of generated verification codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFormat {
    /// Random decimal digits of `code_length` characters.
    Numeric,
    /// A random UUID (v4).
    Uuid,
}

/// Verification code configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Lifetime of email confirmation codes.
    #[serde(with = "humantime_serde")]
    pub email_code_lifetime: Duration,

    /// Lifetime of password reset codes.
    #[serde(with = "humantime_serde")]
    pub reset_code_lifetime: Duration,

    /// Code format.
    pub code_format: CodeFormat,

    /// Number of digits for numeric codes.
    pub code_length: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            email_code_lifetime: Duration::from_secs(3600),
            reset_code_lifetime: Duration::from_secs(15 * 60),
            code_format: CodeFormat::Numeric,
            code_length: 6,
        }
    }
}

/// Deadlines for calls leaving the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeadlineConfig {
    /// Deadline for a single store call.
    #[serde(with = "humantime_serde")]
    pub store: Duration,

    /// Deadline for a single mail dispatch.
    #[serde(with = "humantime_serde")]
    pub mail: Duration,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            mail: Duration::from_secs(15),
        }
    }
}

/// Password rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Minimum password length in characters.
    pub min_length: usize,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

/// Self-registration rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Role assigned when the request names none.
    pub default_role: String,

    /// Roles a registration request may ask for.
    pub allowed_roles: Vec<String>,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            default_role: "user".to_string(),
            allowed_roles: vec!["user".to_string()],
        }
    }
}

/// Where role permissions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionSourceKind {
    /// The `roles` map in this section.
    Static,
    /// The `role_permission` table of the configured store.
    Store,
}

/// Authorization configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Permission source.
    pub source: PermissionSourceKind,

    /// Role name to permitted route names, used by the static source.
    pub roles: HashMap<String, Vec<String>>,

    /// Request parameter that must equal the token username for role "user".
    /// Unset keeps every "user" request bound.
    pub bind_user_param: Option<String>,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        let mut roles = HashMap::new();
        roles.insert(
            "admin".to_string(),
            vec!["GetAllUsers".to_string(), "GetUser".to_string()],
        );
        roles.insert("user".to_string(), vec!["GetUser".to_string()]);
        Self {
            source: PermissionSourceKind::Static,
            roles,
            bind_user_param: None,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// The signing secret itself is checked when the key ring is built, since
    /// it may only be available from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a token lifetime is outside
    /// 1s..=366d, a code lifetime or deadline is zero,
    /// the access lifetime is not shorter than the refresh lifetime, the
    /// algorithm is not an HMAC algorithm, or numeric codes are too short.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, lifetime) in [
            ("access_token_lifetime", self.tokens.access_token_lifetime),
            ("refresh_token_lifetime", self.tokens.refresh_token_lifetime),
        ] {
            if lifetime < MIN_TOKEN_LIFETIME || lifetime > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must be between 1s and 366d"
                )));
            }
        }

        if self.tokens.access_token_lifetime >= self.tokens.refresh_token_lifetime {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be shorter than refresh_token_lifetime".to_string(),
            ));
        }

        match self.signing.algorithm.as_str() {
            "HS256" | "HS384" | "HS512" => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid signing algorithm: '{}'. Must be HS256, HS384, or HS512",
                    other
                )));
            }
        }

        if self.signing.key_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "signing key_id cannot be empty".to_string(),
            ));
        }

        if self
            .signing
            .retired_keys
            .iter()
            .any(|k| k.key_id == self.signing.key_id)
        {
            return Err(ConfigError::InvalidValue(format!(
                "retired key '{}' reuses the current key_id",
                self.signing.key_id
            )));
        }

        if self.verification.email_code_lifetime.is_zero()
            || self.verification.reset_code_lifetime.is_zero()
        {
            return Err(ConfigError::InvalidValue(
                "verification code lifetimes must be > 0".to_string(),
            ));
        }

        if self.verification.code_format == CodeFormat::Numeric
            && !(4..=12).contains(&self.verification.code_length)
        {
            return Err(ConfigError::InvalidValue(
                "code_length must be between 4 and 12".to_string(),
            ));
        }

        if self.deadlines.store.is_zero() || self.deadlines.mail.is_zero() {
            return Err(ConfigError::InvalidValue(
                "deadlines must be > 0".to_string(),
            ));
        }

        if !self
            .registration
            .allowed_roles
            .contains(&self.registration.default_role)
        {
            return Err(ConfigError::InvalidValue(format!(
                "default_role '{}' must be one of allowed_roles",
                self.registration.default_role
            )));
        }

        if self.password.min_length == 0 {
            return Err(ConfigError::InvalidValue(
                "password min_length must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(
            config.tokens.access_token_lifetime,
            Duration::from_secs(1800)
        );
        assert_eq!(
            config.tokens.refresh_token_lifetime,
            Duration::from_secs(30 * 24 * 3600)
        );
        assert_eq!(config.signing.algorithm, "HS256");
        assert_eq!(config.verification.code_format, CodeFormat::Numeric);
        assert_eq!(
            config.verification.reset_code_lifetime,
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_default_config_validates() {
        assert!(AuthConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_algorithm_fails_validation() {
        let mut config = AuthConfig::default();
        config.signing.algorithm = "RS256".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("signing algorithm"));
    }

    #[test]
    fn test_valid_algorithms() {
        for alg in ["HS256", "HS384", "HS512"] {
            let mut config = AuthConfig::default();
            config.signing.algorithm = alg.to_string();
            assert!(
                config.validate().is_ok(),
                "Algorithm {} should be valid",
                alg
            );
        }
    }

    #[test]
    fn test_token_lifetime_bounds() {
        let mut config = AuthConfig::default();
        config.tokens.access_token_lifetime = Duration::from_millis(500);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access_token_lifetime must be between"));

        let mut config = AuthConfig::default();
        config.tokens.refresh_token_lifetime = Duration::from_secs(u64::MAX);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("refresh_token_lifetime must be between"));

        let mut config = AuthConfig::default();
        config.tokens.access_token_lifetime = MIN_TOKEN_LIFETIME;
        config.tokens.refresh_token_lifetime = MAX_TOKEN_LIFETIME;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_access_lifetime_must_be_shorter() {
        let mut config = AuthConfig::default();
        config.tokens.access_token_lifetime = Duration::from_secs(60 * 24 * 3600);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("access_token_lifetime"));
    }

    #[test]
    fn test_retired_key_id_collision() {
        let mut config = AuthConfig::default();
        config.signing.retired_keys.push(RetiredKey {
            key_id: "primary".to_string(),
            secret: "x".repeat(32),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_deadline_fails_validation() {
        let mut config = AuthConfig::default();
        config.deadlines.store = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deadlines"));
    }

    #[test]
    fn test_short_numeric_code_fails_validation() {
        let mut config = AuthConfig::default();
        config.verification.code_length = 2;
        assert!(config.validate().is_err());

        config.verification.code_format = CodeFormat::Uuid;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_role_must_be_allowed() {
        let mut config = AuthConfig::default();
        config.registration.default_role = "admin".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_role"));
    }

    #[test]
    fn test_resolve_inline_secret() {
        let config = SigningConfig {
            secret: Some("inline-secret".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_secret().unwrap(), "inline-secret");
    }

    #[test]
    fn test_resolve_missing_secret() {
        let config = SigningConfig {
            secret_env: "GATEKEY_TEST_SECRET_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        let err = config.resolve_secret().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = SigningConfig {
            secret: Some("super-secret-value".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_toml_durations() {
        let config: AuthConfig = toml::from_str(
            r#"
            [tokens]
            access_token_lifetime = "10m"

            [verification]
            code_format = "uuid"

            [authorization]
            source = "store"
            bind_user_param = "username"
            "#,
        )
        .unwrap();
        assert_eq!(config.tokens.access_token_lifetime, Duration::from_secs(600));
        assert_eq!(config.verification.code_format, CodeFormat::Uuid);
        assert_eq!(config.authorization.source, PermissionSourceKind::Store);
        assert_eq!(
            config.authorization.bind_user_param.as_deref(),
            Some("username")
        );
    }
}
