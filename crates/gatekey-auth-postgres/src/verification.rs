//! Verification code storage for PostgreSQL.
//!
//! One row per (email, code type). `check` locks the row with
//! `SELECT ... FOR UPDATE` so that concurrent checks of the same code see a
//! single winner.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use gatekey_auth::AuthResult;
use gatekey_auth::storage::VerificationCodeStorage;
use gatekey_auth::types::{CodeCheck, CodeType, VerificationCode};

use crate::{PgPool, StorageError, map_storage_error};

type CodeRow = (String, i16, String, OffsetDateTime);

fn into_code(row: CodeRow) -> Result<VerificationCode, StorageError> {
    let (email, code_type, code, expires_at) = row;
    let code_type = CodeType::from_i16(code_type)
        .ok_or_else(|| StorageError::corrupt(format!("unknown code type {}", code_type)))?;
    Ok(VerificationCode {
        email,
        code_type,
        code,
        expires_at,
    })
}

/// Arc-owning PostgreSQL verification code storage.
#[derive(Clone)]
pub struct PgVerificationCodeStorage {
    pool: Arc<PgPool>,
}

impl PgVerificationCodeStorage {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Delete expired codes.
    ///
    /// # Returns
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let result = query("DELETE FROM verification_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_storage_error(e.into()))?;
        Ok(result.rows_affected())
    }

    async fn check_in_tx(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
        consume: bool,
    ) -> Result<CodeCheck, StorageError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<CodeRow> = query_as(
            r#"
            SELECT email, code_type, code, expires_at
            FROM verification_codes
            WHERE email = $1 AND code_type = $2
            FOR UPDATE
            "#,
        )
        .bind(email)
        .bind(code_type.as_i16())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(CodeCheck::NotFound);
        };

        let outcome = into_code(row)?.check(supplied, now);
        let remove = match outcome {
            CodeCheck::Expired => true,
            CodeCheck::Valid => consume,
            CodeCheck::Mismatch | CodeCheck::NotFound => false,
        };
        if remove {
            query("DELETE FROM verification_codes WHERE email = $1 AND code_type = $2")
                .bind(email)
                .bind(code_type.as_i16())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

#[async_trait]
impl VerificationCodeStorage for PgVerificationCodeStorage {
    async fn store(&self, code: &VerificationCode) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO verification_codes (email, code_type, code, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email, code_type) DO UPDATE SET
                code = EXCLUDED.code,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&code.email)
        .bind(code.code_type.as_i16())
        .bind(&code.code)
        .bind(code.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_storage_error(e.into()))?;

        Ok(())
    }

    async fn get(
        &self,
        email: &str,
        code_type: CodeType,
    ) -> AuthResult<Option<VerificationCode>> {
        let row: Option<CodeRow> = query_as(
            r#"
            SELECT email, code_type, code, expires_at
            FROM verification_codes
            WHERE email = $1 AND code_type = $2
            "#,
        )
        .bind(email)
        .bind(code_type.as_i16())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_storage_error(e.into()))?;

        row.map(into_code)
            .transpose()
            .map_err(map_storage_error)
    }

    async fn delete(&self, email: &str, code_type: CodeType) -> AuthResult<bool> {
        let result = query("DELETE FROM verification_codes WHERE email = $1 AND code_type = $2")
            .bind(email)
            .bind(code_type.as_i16())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_storage_error(e.into()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn check(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
        consume: bool,
    ) -> AuthResult<CodeCheck> {
        self.check_in_tx(email, code_type, supplied, now, consume)
            .await
            .map_err(map_storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_row_mapping() {
        let at = datetime!(2026-01-02 03:04 UTC);
        let code = into_code(("bob@x.com".to_string(), 2, "999999".to_string(), at)).unwrap();
        assert_eq!(code.code_type, CodeType::PasswordReset);
        assert_eq!(code.expires_at, at);
    }

    #[test]
    fn test_unknown_code_type_is_corrupt() {
        let at = datetime!(2026-01-02 03:04 UTC);
        let err = into_code(("bob@x.com".to_string(), 9, "1".to_string(), at)).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
