//! In-process storage backend.
//!
//! Holds principals, refresh token digests, verification codes and role
//! grants in concurrent maps. Verification code checks run under the map's
//! per-key entry lock, which makes them atomic with respect to each other.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use crate::policy::{PermissionSource, RouteSet};
use crate::storage::{
    RefreshTokenStorage, UserStorage, VerificationCodeStorage, hash_refresh_token,
};
use crate::types::{CodeCheck, CodeType, NewPrincipal, Principal, VerificationCode};
use crate::{AuthError, AuthResult};

/// In-memory implementation of every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, Principal>,
    /// Username to email; reserved before the principal is inserted.
    usernames: DashMap<String, String>,
    refresh_tokens: DashMap<String, OffsetDateTime>,
    codes: DashMap<(String, CodeType), VerificationCode>,
    grants: DashMap<String, RouteSet>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a principal as-is, bypassing registration.
    pub fn insert_principal(&self, principal: Principal) {
        let username = principal.username.clone();
        self.usernames
            .insert(username.clone(), principal.email.clone());
        if let Some(previous) = self.users.insert(principal.email.clone(), principal)
            && previous.username != username
        {
            self.usernames
                .remove_if(&previous.username, |_, email| *email == previous.email);
        }
    }

    /// Replaces the routes granted to `role`.
    pub fn grant_routes<I, S>(&self, role: &str, routes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .insert(role.to_string(), RouteSet::from_iter(routes));
    }

    /// Roles that currently have grants.
    #[must_use]
    pub fn granted_roles(&self) -> HashSet<String> {
        self.grants.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of stored refresh tokens.
    #[must_use]
    pub fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.len()
    }

    /// Number of stored verification codes.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    fn key(email: &str, code_type: CodeType) -> (String, CodeType) {
        (email.to_string(), code_type)
    }
}

#[async_trait]
impl UserStorage for MemoryStore {
    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<Principal>> {
        if let Some(principal) = self.users.get(identifier) {
            return Ok(Some(principal.clone()));
        }
        self.find_by_username(identifier).await
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        Ok(self.users.get(email).map(|p| p.clone()))
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
        let Some(email) = self.usernames.get(username).map(|e| e.clone()) else {
            return Ok(None);
        };
        Ok(self
            .users
            .get(&email)
            .filter(|p| p.username == username)
            .map(|p| p.clone()))
    }

    async fn list(&self) -> AuthResult<Vec<Principal>> {
        let mut users: Vec<Principal> = self.users.iter().map(|p| p.clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create(&self, principal: &NewPrincipal) -> AuthResult<Principal> {
        match self.usernames.entry(principal.username.clone()) {
            Entry::Occupied(_) => return Err(AuthError::validation("username already registered")),
            Entry::Vacant(slot) => {
                slot.insert(principal.email.clone());
            }
        }

        match self.users.entry(principal.email.clone()) {
            Entry::Occupied(_) => {
                self.usernames
                    .remove_if(&principal.username, |_, email| *email == principal.email);
                Err(AuthError::validation("email already registered"))
            }
            Entry::Vacant(slot) => {
                let created = principal.clone().into_principal(OffsetDateTime::now_utc());
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn set_verified(&self, email: &str, verified: bool) -> AuthResult<bool> {
        Ok(match self.users.get_mut(email) {
            Some(mut principal) => {
                principal.is_verified = verified;
                principal.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        })
    }

    async fn update_password(
        &self,
        email: &str,
        password_hash: &str,
        token_hash: &str,
    ) -> AuthResult<bool> {
        Ok(match self.users.get_mut(email) {
            Some(mut principal) => {
                principal.password_hash = password_hash.to_string();
                principal.token_hash = token_hash.to_string();
                principal.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryStore {
    async fn save(&self, token: &str) -> AuthResult<()> {
        self.refresh_tokens
            .entry(hash_refresh_token(token))
            .or_insert_with(OffsetDateTime::now_utc);
        Ok(())
    }

    async fn exists(&self, token: &str) -> AuthResult<bool> {
        Ok(self.refresh_tokens.contains_key(&hash_refresh_token(token)))
    }
}

#[async_trait]
impl VerificationCodeStorage for MemoryStore {
    async fn store(&self, code: &VerificationCode) -> AuthResult<()> {
        self.codes
            .insert(Self::key(&code.email, code.code_type), code.clone());
        Ok(())
    }

    async fn get(
        &self,
        email: &str,
        code_type: CodeType,
    ) -> AuthResult<Option<VerificationCode>> {
        Ok(self
            .codes
            .get(&Self::key(email, code_type))
            .map(|c| c.clone()))
    }

    async fn delete(&self, email: &str, code_type: CodeType) -> AuthResult<bool> {
        Ok(self.codes.remove(&Self::key(email, code_type)).is_some())
    }

    async fn check(
        &self,
        email: &str,
        code_type: CodeType,
        supplied: &str,
        now: OffsetDateTime,
        consume: bool,
    ) -> AuthResult<CodeCheck> {
        let entry = match self.codes.entry(Self::key(email, code_type)) {
            Entry::Vacant(_) => return Ok(CodeCheck::NotFound),
            Entry::Occupied(entry) => entry,
        };

        let outcome = entry.get().check(supplied, now);
        match outcome {
            CodeCheck::Expired => {
                entry.remove();
            }
            CodeCheck::Valid if consume => {
                entry.remove();
            }
            _ => {}
        }
        Ok(outcome)
    }
}

#[async_trait]
impl PermissionSource for MemoryStore {
    async fn routes_for(&self, role: &str) -> AuthResult<RouteSet> {
        Ok(self
            .grants
            .get(role)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}
