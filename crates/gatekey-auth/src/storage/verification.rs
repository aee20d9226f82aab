//! Verification code storage trait.
//!
//! Codes are keyed by `(email, code_type)`. Checking a supplied code is a
//! single atomic operation so that two concurrent confirmations cannot both
//! observe a match.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::{CodeCheck, CodeType, VerificationCode};

/// Storage trait for verification codes.
#[async_trait]
pub trait VerificationCodeStorage: Send + Sync {
    /// Stores a code, replacing any code for the same email and type.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn store(&self, code: &VerificationCode) -> AuthResult<()>;

    /// Returns the code stored for the email and type, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, email: &str, code_type: CodeType)
    -> AuthResult<Option<VerificationCode>>;

    /// Deletes the code for the email and type. Returns `true` if one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, email: &str, code_type: CodeType) -> AuthResult<bool>;

    /// Checks `supplied` against the stored code as one atomic step.
    ///
    /// - No record: [`CodeCheck::NotFound`].
    /// - Expired at `now`: the record is deleted, [`CodeCheck::Expired`].
    /// - Different code: the record is kept, [`CodeCheck::Mismatch`].
    /// - Match: [`CodeCheck::Valid`]; the record is deleted when `consume`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn check(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
        consume: bool,
    ) -> AuthResult<CodeCheck>;
}
