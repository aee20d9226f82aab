//! Refresh token storage for PostgreSQL.
//!
//! Only the SHA-256 digest of a token is written; a database leak does not
//! expose usable refresh tokens.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_scalar::query_scalar;

use gatekey_auth::AuthResult;
use gatekey_auth::storage::{RefreshTokenStorage, hash_refresh_token};

use crate::{PgPool, map_storage_error};

/// Arc-owning PostgreSQL refresh token storage.
#[derive(Clone)]
pub struct PgRefreshTokenStorage {
    pool: Arc<PgPool>,
}

impl PgRefreshTokenStorage {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStorage for PgRefreshTokenStorage {
    async fn save(&self, token: &str) -> AuthResult<()> {
        query(
            r#"
            INSERT INTO refresh_tokens (token_hash, created_at)
            VALUES ($1, NOW())
            ON CONFLICT (token_hash) DO NOTHING
            "#,
        )
        .bind(hash_refresh_token(token))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_storage_error(e.into()))?;

        Ok(())
    }

    async fn exists(&self, token: &str) -> AuthResult<bool> {
        query_scalar("SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)")
            .bind(hash_refresh_token(token))
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_storage_error(e.into()))
    }
}
