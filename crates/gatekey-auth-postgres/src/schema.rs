//! Table definitions.

use sqlx_core::query::query;

use crate::{PgPool, StorageResult};

/// Idempotent DDL for every auth table, applied in order.
pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NOT NULL UNIQUE,
        role          TEXT NOT NULL,
        is_verified   BOOLEAN NOT NULL DEFAULT FALSE,
        password_hash TEXT NOT NULL,
        token_hash    TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        token_hash TEXT PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS verification_codes (
        email      TEXT NOT NULL,
        code_type  SMALLINT NOT NULL,
        code       TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (email, code_type)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_permission (
        role_name TEXT PRIMARY KEY,
        routes    JSONB NOT NULL DEFAULT '[]'::jsonb
    )
    "#,
];

/// Runs every statement in [`STATEMENTS`] inside one transaction.
pub async fn bootstrap(pool: &PgPool) -> StorageResult<()> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(tables = STATEMENTS.len(), "Auth schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_are_idempotent() {
        for statement in STATEMENTS {
            assert!(statement.contains("IF NOT EXISTS"));
        }
    }

    #[test]
    fn test_codes_keyed_by_email_and_type() {
        let codes = STATEMENTS
            .iter()
            .find(|s| s.contains("verification_codes"))
            .unwrap();
        assert!(codes.contains("PRIMARY KEY (email, code_type)"));
    }
}
