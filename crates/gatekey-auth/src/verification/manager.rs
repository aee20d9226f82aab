//! Verification code lifecycle.
//!
//! A code is stored per `(email, code type)` with an absolute expiry. A new
//! code for the same pair replaces the old one. Validation consumes the code
//! atomically on success; an expired code is removed when it is looked at;
//! a wrong code leaves the record in place so the caller can retry.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::deadline::within;
use crate::error::CodeRejection;
use crate::storage::VerificationCodeStorage;
use crate::types::{CodeCheck, CodeType, VerificationCode};
use crate::verification::code::CodeGenerator;
use crate::{AuthError, AuthResult};

/// Stores, validates and expires verification codes.
#[derive(Clone)]
pub struct VerificationCodeManager {
    storage: Arc<dyn VerificationCodeStorage>,
    generator: Arc<dyn CodeGenerator>,
    deadline: Duration,
}

impl VerificationCodeManager {
    #[must_use]
    pub fn new(
        storage: Arc<dyn VerificationCodeStorage>,
        generator: Arc<dyn CodeGenerator>,
        deadline: Duration,
    ) -> Self {
        Self {
            storage,
            generator,
            deadline,
        }
    }

    /// Stores `code` for the pair, expiring `ttl` after `now`.
    ///
    /// # Errors
    ///
    /// Returns an unexpected-category error if the store fails or times out.
    pub async fn store_code(
        &self,
        email: &str,
        code_type: CodeType,
        code: &str,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> AuthResult<VerificationCode> {
        let record = VerificationCode {
            email: email.to_string(),
            code_type,
            code: code.to_string(),
            expires_at: now + ttl,
        };
        within(self.deadline, "codes.store", self.storage.store(&record)).await?;
        debug!(email, %code_type, expires_at = %record.expires_at, "Verification code stored");
        Ok(record)
    }

    /// Generates and stores a new code for the pair.
    ///
    /// # Errors
    ///
    /// See [`Self::store_code`].
    pub async fn issue_code(
        &self,
        email: &str,
        code_type: CodeType,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> AuthResult<VerificationCode> {
        let code = self.generator.generate(code_type);
        self.store_code(email, code_type, &code, ttl, now).await
    }

    /// Validates and consumes a supplied code.
    ///
    /// A second call with the same code fails with `NotFound`.
    ///
    /// # Errors
    ///
    /// - `AuthError::CodeRejected` with `NotFound`, `Expired` or `Mismatch`.
    /// - An unexpected-category error if the store fails or times out.
    pub async fn validate_code(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
    ) -> AuthResult<()> {
        self.check(email, code_type, supplied, now, true).await
    }

    /// Validates a supplied code without consuming it.
    ///
    /// Expired codes are still removed.
    ///
    /// # Errors
    ///
    /// See [`Self::validate_code`].
    pub async fn peek_code(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
    ) -> AuthResult<()> {
        self.check(email, code_type, supplied, now, false).await
    }

    /// Removes the code for the pair, if any.
    ///
    /// # Errors
    ///
    /// Returns an unexpected-category error if the store fails or times out.
    pub async fn discard(&self, email: &str, code_type: CodeType) -> AuthResult<bool> {
        within(self.deadline, "codes.delete", self.storage.delete(email, code_type)).await
    }

    async fn check(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
        consume: bool,
    ) -> AuthResult<()> {
        let outcome = within(
            self.deadline,
            "codes.check",
            self.storage.check(email, code_type, supplied, now, consume),
        )
        .await?;

        let rejection = match outcome {
            CodeCheck::Valid => {
                info!(email, %code_type, consumed = consume, "Verification code accepted");
                return Ok(());
            }
            CodeCheck::NotFound => CodeRejection::NotFound,
            CodeCheck::Expired => CodeRejection::Expired,
            CodeCheck::Mismatch => CodeRejection::Mismatch,
        };
        warn!(email, %code_type, reason = ?rejection, "Verification code rejected");
        Err(AuthError::code_rejected(rejection))
    }
}
