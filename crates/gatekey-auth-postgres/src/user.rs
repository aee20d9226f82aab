//! Principal storage for PostgreSQL.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use gatekey_auth::storage::UserStorage;
use gatekey_auth::types::{NewPrincipal, Principal};
use gatekey_auth::AuthResult;

use crate::{PgPool, StorageError, map_storage_error};

type UserRow = (
    Uuid,
    String,
    String,
    String,
    bool,
    String,
    String,
    OffsetDateTime,
    OffsetDateTime,
);

const COLUMNS: &str =
    "id, username, email, role, is_verified, password_hash, token_hash, created_at, updated_at";

fn into_principal(row: UserRow) -> Principal {
    let (id, username, email, role, is_verified, password_hash, token_hash, created_at, updated_at) =
        row;
    Principal {
        id,
        username,
        email,
        role,
        is_verified,
        password_hash,
        token_hash,
        created_at,
        updated_at,
    }
}

/// Arc-owning PostgreSQL principal storage.
#[derive(Clone)]
pub struct PgUserStorage {
    pool: Arc<PgPool>,
}

impl PgUserStorage {
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find_where(&self, predicate: &str, value: &str) -> AuthResult<Option<Principal>> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE {predicate}");
        let row: Option<UserRow> = query_as(&sql)
            .bind(value)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_storage_error(e.into()))?;
        Ok(row.map(into_principal))
    }
}

#[async_trait]
impl UserStorage for PgUserStorage {
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<Principal>> {
        self.find_where("email = $1 OR username = $1 ORDER BY (email = $1) DESC LIMIT 1", identifier)
            .await
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        self.find_where("email = $1", email).await
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
        self.find_where("username = $1", username).await
    }

    async fn list(&self) -> AuthResult<Vec<Principal>> {
        let sql = format!("SELECT {COLUMNS} FROM users ORDER BY username");
        let rows: Vec<UserRow> = query_as(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_storage_error(e.into()))?;
        Ok(rows.into_iter().map(into_principal).collect())
    }

    async fn create(&self, principal: &NewPrincipal) -> AuthResult<Principal> {
        let sql = format!(
            r#"
            INSERT INTO users (id, username, email, role, is_verified, password_hash, token_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6, NOW(), NOW())
            RETURNING {COLUMNS}
            "#
        );
        let row: UserRow = query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&principal.username)
            .bind(&principal.email)
            .bind(&principal.role)
            .bind(&principal.password_hash)
            .bind(&principal.token_hash)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| {
                if let sqlx_core::Error::Database(ref db_err) = e
                    && db_err.is_unique_violation()
                {
                    return map_storage_error(StorageError::conflict(
                        "username or email already registered",
                    ));
                }
                map_storage_error(e.into())
            })?;

        Ok(into_principal(row))
    }

    async fn set_verified(&self, email: &str, verified: bool) -> AuthResult<bool> {
        let result = query("UPDATE users SET is_verified = $2, updated_at = NOW() WHERE email = $1")
            .bind(email)
            .bind(verified)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_storage_error(e.into()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
        token_hash: &str,
    ) -> AuthResult<bool> {
        let result = query(
            r#"
            UPDATE users
            SET password_hash = $2, token_hash = $3, updated_at = NOW()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(token_hash)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_storage_error(e.into()))?;
        Ok(result.rows_affected() > 0)
    }
}
