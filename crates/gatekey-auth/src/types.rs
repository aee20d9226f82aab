//! Domain types shared by the service and the storage backends.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::token::Identity;

// =============================================================================
// Principal
// =============================================================================

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Set once the email address is confirmed; gates login.
    pub is_verified: bool,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Opaque marker rotated on every password reset.
    pub token_hash: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Principal {
    /// Identity fields embedded in tokens issued to this principal.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(&self.username, &self.role, &self.email)
    }
}

/// Data required to create a principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub role: String,
    pub password_hash: String,
    pub token_hash: String,
}

impl NewPrincipal {
    /// Materializes the principal as stored, unverified.
    #[must_use]
    pub fn into_principal(self, now: OffsetDateTime) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: self.username,
            email: self.email,
            role: self.role,
            is_verified: false,
            password_hash: self.password_hash,
            token_hash: self.token_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Verification Codes
// =============================================================================

/// Purpose of a verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    /// Confirms control of the email address after registration.
    EmailConfirm,
    /// Authorizes a password reset.
    PasswordReset,
}

impl CodeType {
    /// Stable numeric value used by the database column.
    #[must_use]
    pub fn as_i16(self) -> i16 {
        match self {
            Self::EmailConfirm => 1,
            Self::PasswordReset => 2,
        }
    }

    /// Parses the database column value.
    #[must_use]
    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            1 => Some(Self::EmailConfirm),
            2 => Some(Self::PasswordReset),
            _ => None,
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailConfirm => write!(f, "email_confirm"),
            Self::PasswordReset => write!(f, "password_reset"),
        }
    }
}

/// A stored one-time code. At most one exists per (email, code type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationCode {
    pub email: String,
    pub code_type: CodeType,
    pub code: String,
    pub expires_at: OffsetDateTime,
}

impl VerificationCode {
    /// Returns `true` once `now` has reached the expiry time.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// Compares a supplied code, ignoring surrounding whitespace.
    #[must_use]
    pub fn matches(&self, supplied: &str) -> bool {
        self.code == supplied.trim()
    }

    /// Evaluates a supplied code at `now`.
    #[must_use]
    pub fn check(&self, supplied: &str, now: OffsetDateTime) -> CodeCheck {
        if self.is_expired_at(now) {
            CodeCheck::Expired
        } else if self.matches(supplied) {
            CodeCheck::Valid
        } else {
            CodeCheck::Mismatch
        }
    }
}

/// Outcome of checking a supplied code against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    /// The code matched and has not expired.
    Valid,
    /// No code is stored for the email and purpose.
    NotFound,
    /// The stored code expired and was removed.
    Expired,
    /// The code differs; the stored record is kept.
    Mismatch,
}
