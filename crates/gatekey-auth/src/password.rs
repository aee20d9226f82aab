//! Password hashing and rules.
//!
//! # Security
//!
//! - Hashing uses Argon2id with default parameters
//! - Salts are generated using OsRng
//! - Token hash markers are 256-bit random values, hex encoded

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::config::PasswordConfig;
use crate::{AuthError, AuthResult};

/// Hashes a password into a PHC string.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; `Err` only if the stored hash is invalid.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if `hash` cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generates a fresh token hash marker.
#[must_use]
pub fn generate_token_hash() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Checks a new password against the configured rules.
///
/// # Errors
///
/// Returns `AuthError::Validation` describing the first violated rule.
pub fn check_password_rules(password: &str, config: &PasswordConfig) -> AuthResult<()> {
    if password.trim().is_empty() {
        return Err(AuthError::validation("password cannot be empty"));
    }
    if password.chars().count() < config.min_length {
        return Err(AuthError::validation(format!(
            "password must be at least {} characters",
            config.min_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hash_uses_unique_salt() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_invalid_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_token_hash_marker() {
        let a = generate_token_hash();
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_token_hash());
    }

    #[test]
    fn test_password_rules() {
        let config = PasswordConfig { min_length: 8 };
        assert!(check_password_rules("long enough", &config).is_ok());
        assert!(check_password_rules("short", &config).is_err());
        assert!(check_password_rules("        ", &config).is_err());
    }
}
