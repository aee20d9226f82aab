//! PostgreSQL storage backend for gatekey-auth
//!
//! Provides persistent storage for:
//!
//! - Principals (`users` table)
//! - Issued refresh tokens, stored as SHA-256 digests (`refresh_tokens`)
//! - One-time verification codes (`verification_codes`)
//! - Role → route grants (`role_permission`)
//!
//! Tables are created by [`PostgresAuthStorage::bootstrap`], which is safe to
//! run on every start.
//!
//! # Example
//!
//! ```ignore
//! use gatekey_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/gatekey", 10).await?;
//! storage.bootstrap().await?;
//! let stores = storage.stores();
//! ```

pub mod permission;
pub mod refresh_token;
pub mod schema;
pub mod user;
pub mod verification;

use std::sync::Arc;

use gatekey_auth::AuthError;
use gatekey_auth::service::AuthStores;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use permission::PgPermissionSource;
pub use refresh_token::PgRefreshTokenStorage;
pub use user::PgUserStorage;
pub use verification::PgVerificationCodeStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// A unique constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be interpreted.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a `Corrupt` error.
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Converts a storage error to an auth error.
///
/// Conflicts are caller mistakes (a taken email or username); everything
/// else is an unexpected storage failure.
pub(crate) fn map_storage_error(err: StorageError) -> AuthError {
    if err.is_conflict() {
        AuthError::validation(err.to_string())
    } else {
        AuthError::storage(err.to_string())
    }
}

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for authentication data.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the auth tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub async fn bootstrap(&self) -> StorageResult<()> {
        schema::bootstrap(&self.pool).await
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn users(&self) -> PgUserStorage {
        PgUserStorage::new(Arc::clone(&self.pool))
    }

    #[must_use]
    pub fn refresh_tokens(&self) -> PgRefreshTokenStorage {
        PgRefreshTokenStorage::new(Arc::clone(&self.pool))
    }

    #[must_use]
    pub fn codes(&self) -> PgVerificationCodeStorage {
        PgVerificationCodeStorage::new(Arc::clone(&self.pool))
    }

    #[must_use]
    pub fn permissions(&self) -> PgPermissionSource {
        PgPermissionSource::new(Arc::clone(&self.pool))
    }

    /// Every store backed by this pool, ready for `AuthService::new`.
    #[must_use]
    pub fn stores(&self) -> AuthStores {
        AuthStores {
            users: Arc::new(self.users()),
            refresh_tokens: Arc::new(self.refresh_tokens()),
            codes: Arc::new(self.codes()),
            permissions: Arc::new(self.permissions()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
