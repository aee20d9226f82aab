//! Principal storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{NewPrincipal, Principal};

/// Storage trait for principals.
///
/// Emails are stored and looked up in the normalized (trimmed, lowercase)
/// form produced by the service layer.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Finds a principal by email or username.
    ///
    /// # Arguments
    ///
    /// * `identifier` - An email address or a username
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<Principal>>;

    /// Finds a principal by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>>;

    /// Finds a principal by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>>;

    /// Lists all principals ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self) -> AuthResult<Vec<Principal>>;

    /// Creates an unverified principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the email or username is taken, or
    /// a storage error if the operation fails.
    async fn create(&self, principal: &NewPrincipal) -> AuthResult<Principal>;

    /// Sets the verified flag. Returns `false` if no principal has `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set_verified(&self, email: &str, verified: bool) -> AuthResult<bool>;

    /// Replaces the password hash and token hash together.
    /// Returns `false` if no principal has `email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
        token_hash: &str,
    ) -> AuthResult<bool>;
}
