//! Authentication service.
//!
//! [`AuthService`] is the entry point used by the HTTP layer. It ties the
//! token issuer and verifier, the refresh token store, the authorization
//! engine and the verification code workflow to the principal store and the
//! mail dispatcher. Every store and mail call runs under a deadline.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::{AuthConfig, PasswordConfig, RegistrationConfig, VerificationConfig};
use crate::deadline::within;
use crate::mail::{MailDispatcher, MailMessage};
use crate::password::{check_password_rules, generate_token_hash, hash_password, verify_password};
use crate::policy::{
    AuthorizationEngine, ParamBinding, PermissionSource, RequestBinding, RequestParams,
};
use crate::storage::{RefreshTokenStorage, UserStorage, VerificationCodeStorage};
use crate::token::{AccessClaims, KeyProvider, TokenIssuer, TokenState, TokenVerifier};
use crate::types::{CodeType, NewPrincipal, Principal};
use crate::verification::{CodeGenerator, VerificationCodeManager, generator_from_config};
use crate::{AuthError, AuthResult};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// Storage backends used by the service.
#[derive(Clone)]
pub struct AuthStores {
    pub users: Arc<dyn UserStorage>,
    pub refresh_tokens: Arc<dyn RefreshTokenStorage>,
    pub codes: Arc<dyn VerificationCodeStorage>,
    pub permissions: Arc<dyn PermissionSource>,
}

/// Tokens returned by a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token returned by a successful refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedToken {
    pub access_token: String,
}

/// A self-registration request.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

/// Token lifecycle, authorization and verification workflows.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
    mailer: Arc<dyn MailDispatcher>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    engine: AuthorizationEngine,
    codes: VerificationCodeManager,
    code_storage: Arc<dyn VerificationCodeStorage>,
    verification: VerificationConfig,
    password: PasswordConfig,
    registration: RegistrationConfig,
    store_deadline: Duration,
    mail_deadline: Duration,
    clock: Clock,
}

impl AuthService {
    /// Creates a service from configuration, keys, stores and a mail dispatcher.
    #[must_use]
    pub fn new(
        config: &AuthConfig,
        keys: Arc<dyn KeyProvider>,
        stores: AuthStores,
        mailer: Arc<dyn MailDispatcher>,
    ) -> Self {
        let issuer = TokenIssuer::new(keys.clone(), &config.tokens);
        let verifier = TokenVerifier::new(keys);

        let binding: Arc<dyn RequestBinding> = match &config.authorization.bind_user_param {
            Some(param) => Arc::new(ParamBinding::new(param.clone())),
            None => Arc::new(crate::policy::AllowAll),
        };
        let engine = AuthorizationEngine::new(verifier.clone(), stores.permissions.clone())
            .with_binding(binding)
            .with_lookup_deadline(config.deadlines.store);

        let codes = VerificationCodeManager::new(
            stores.codes.clone(),
            generator_from_config(&config.verification),
            config.deadlines.store,
        );

        Self {
            users: stores.users,
            refresh_tokens: stores.refresh_tokens,
            mailer,
            issuer,
            verifier,
            engine,
            codes,
            code_storage: stores.codes,
            verification: config.verification.clone(),
            password: config.password.clone(),
            registration: config.registration.clone(),
            store_deadline: config.deadlines.store,
            mail_deadline: config.deadlines.mail,
            clock: Arc::new(OffsetDateTime::now_utc),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the verification code generator.
    #[must_use]
    pub fn with_code_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.codes =
            VerificationCodeManager::new(self.code_storage.clone(), generator, self.store_deadline);
        self
    }

    /// Replaces the identity binding applied to "user" tokens.
    #[must_use]
    pub fn with_binding(mut self, binding: Arc<dyn RequestBinding>) -> Self {
        self.engine = self.engine.with_binding(binding);
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn engine(&self) -> &AuthorizationEngine {
        &self.engine
    }

    fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }

    // =========================================================================
    // Login and tokens
    // =========================================================================

    /// Checks credentials and issues an access and a refresh token.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` if either field is empty.
    /// - `AuthError::Authentication` if the credentials do not match.
    /// - `AuthError::Authorization` ("unverified user") if the email is not
    ///   confirmed yet.
    /// - An unexpected-category error on store, signing or timeout failures.
    pub async fn login(&self, identifier: &str, password: &str) -> AuthResult<TokenPair> {
        let identifier = normalize_identifier(identifier);
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::validation("identifier and password are required"));
        }

        let principal = self.find_credentials(&identifier, password).await?;
        if !principal.is_verified {
            warn!(username = %principal.username, "Login refused for unverified user");
            return Err(AuthError::authorization("unverified user"));
        }

        let now = self.now();
        let identity = principal.identity();
        let access_token = self.issuer.new_access_token(&identity, now)?;
        let refresh_token = self.issuer.new_refresh_token(&identity, now)?;

        within(
            self.store_deadline,
            "refresh_tokens.save",
            self.refresh_tokens.save(&refresh_token),
        )
        .await?;

        info!(username = %principal.username, role = %principal.role, "Login succeeded");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Finds the principal whose identifier and password both match.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Authentication` ("invalid credentials") if no
    /// principal matches.
    pub async fn find_credentials(&self, identifier: &str, password: &str) -> AuthResult<Principal> {
        let found = within(
            self.store_deadline,
            "users.find_by_identifier",
            self.users.find_by_identifier(identifier),
        )
        .await?;

        let Some(principal) = found else {
            warn!(identifier, "Login for unknown identifier");
            return Err(AuthError::authentication("invalid credentials"));
        };

        if !check_password(password, &principal.password_hash).await? {
            warn!(username = %principal.username, "Login with wrong password");
            return Err(AuthError::authentication("invalid credentials"));
        }
        Ok(principal)
    }

    /// Exchanges an expired access token and a registered refresh token for a
    /// new access token.
    ///
    /// The refresh token is neither rotated nor invalidated.
    ///
    /// # Errors
    ///
    /// `AuthError::Authentication` when:
    /// - the access token is still valid ("cannot refresh before expiry"),
    /// - the access token is malformed or forged ("invalid token"),
    /// - the refresh token was never saved ("refresh token not registered"),
    /// - the refresh token is invalid, expired, or issued to someone else.
    pub async fn refresh(&self, access_token: &str, refresh_token: &str) -> AuthResult<RefreshedToken> {
        let now = self.now();

        let stale = match self.verifier.inspect::<AccessClaims>(access_token, now) {
            Ok(TokenState::Expired(claims)) => claims,
            Ok(TokenState::Active(claims)) => {
                warn!(username = %claims.username, "Refresh attempted before expiry");
                return Err(AuthError::authentication("cannot refresh before expiry"));
            }
            Err(e) => {
                warn!(error = %e, "Refresh with invalid access token");
                return Err(AuthError::authentication("invalid token"));
            }
        };

        let registered = within(
            self.store_deadline,
            "refresh_tokens.exists",
            self.refresh_tokens.exists(refresh_token),
        )
        .await?;
        if !registered {
            warn!(username = %stale.username, "Refresh with unregistered refresh token");
            return Err(AuthError::authentication("refresh token not registered"));
        }

        let refresh_claims = self.verifier.parse_refresh(refresh_token, now).map_err(|e| {
            warn!(username = %stale.username, error = %e, "Refresh with invalid refresh token");
            AuthError::authentication("invalid token")
        })?;
        if refresh_claims.identity() != stale.identity() {
            warn!(username = %stale.username, "Refresh token issued to a different identity");
            return Err(AuthError::authentication("invalid token"));
        }

        let renewed = stale.renewed(now, self.issuer.access_ttl());
        let access_token = self.issuer.sign(&renewed)?;

        info!(username = %renewed.username, "Access token refreshed");
        Ok(RefreshedToken { access_token })
    }

    /// Verifies a bearer token and its permission for a named route.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Authorization` if the token is invalid or expired,
    /// fails the identity binding, or its role lacks the route.
    pub async fn verify(
        &self,
        token: &str,
        route: &str,
        params: &RequestParams,
    ) -> AuthResult<AccessClaims> {
        self.engine.verify(token, route, params, self.now()).await
    }

    // =========================================================================
    // Registration and email verification
    // =========================================================================

    /// Registers an unverified principal and mails an email confirmation code.
    ///
    /// The principal exists once the store accepted it; a mail failure is
    /// still reported to the caller, and the stored code stays valid.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` on malformed input, a disallowed role, or a
    ///   taken username or email.
    /// - An unexpected-category error on store or mail failure.
    pub async fn register(&self, registration: Registration) -> AuthResult<Principal> {
        let username = registration.username.trim().to_string();
        let email = normalize_email(&registration.email);
        let role = registration
            .role
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.registration.default_role.clone());

        if username.is_empty() {
            return Err(AuthError::validation("username is required"));
        }
        check_email(&email)?;
        check_password_rules(&registration.password, &self.password)?;
        if !self.registration.allowed_roles.contains(&role) {
            return Err(AuthError::validation(format!(
                "role '{}' cannot be requested at registration",
                role
            )));
        }

        let password_hash = hash(registration.password).await?;
        let new_principal = NewPrincipal {
            username,
            email,
            role,
            password_hash,
            token_hash: generate_token_hash(),
        };

        let principal = within(
            self.store_deadline,
            "users.create",
            self.users.create(&new_principal),
        )
        .await?;
        info!(username = %principal.username, role = %principal.role, "User registered");

        self.send_code(&principal.email, CodeType::EmailConfirm).await?;
        Ok(principal)
    }

    /// Issues (or re-issues) an email confirmation code.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if no principal has `email`.
    /// - `AuthError::Validation` if the email is already confirmed.
    /// - An unexpected-category error on store or mail failure.
    pub async fn request_email_verification(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        let principal = self.require_principal(&email).await?;
        if principal.is_verified {
            self.codes.discard(&email, CodeType::EmailConfirm).await?;
            return Err(AuthError::validation("email already verified"));
        }
        self.send_code(&email, CodeType::EmailConfirm).await
    }

    /// Confirms an email address with the code that was mailed to it.
    ///
    /// # Errors
    ///
    /// - `AuthError::CodeRejected` if the code is missing, expired or wrong.
    /// - `AuthError::NotFound` if the principal vanished meanwhile.
    /// - An unexpected-category error on store failure.
    pub async fn confirm_email_verification(&self, email: &str, code: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        self.codes
            .validate_code(&email, CodeType::EmailConfirm, code, self.now())
            .await?;

        let updated = within(
            self.store_deadline,
            "users.set_verified",
            self.users.set_verified(&email, true),
        )
        .await?;
        if !updated {
            return Err(AuthError::not_found("user not found"));
        }

        info!(email = %email, "Email verified");
        Ok(())
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Mails a password reset code.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotFound` if no principal has `email`.
    /// - An unexpected-category error on store or mail failure.
    pub async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        self.require_principal(&email).await?;
        self.send_code(&email, CodeType::PasswordReset).await
    }

    /// Checks a password reset code without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CodeRejected` if the code is missing, expired or
    /// wrong.
    pub async fn verify_password_reset_code(&self, email: &str, code: &str) -> AuthResult<()> {
        let email = normalize_email(email);
        self.codes
            .peek_code(&email, CodeType::PasswordReset, code, self.now())
            .await
    }

    /// Sets a new password using a reset code.
    ///
    /// The confirmation field and password rules are checked before any store
    /// call. The code is consumed before the password changes; any rejection
    /// leaves the stored password untouched.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` if the passwords differ or break the rules.
    /// - `AuthError::CodeRejected` if the code is missing, expired or wrong.
    /// - `AuthError::NotFound` if no principal has `email`.
    /// - An unexpected-category error on store failure.
    pub async fn confirm_password_reset(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> AuthResult<()> {
        if new_password != confirm_password {
            return Err(AuthError::validation("passwords do not match"));
        }
        check_password_rules(new_password, &self.password)?;

        let email = normalize_email(email);
        self.codes
            .validate_code(&email, CodeType::PasswordReset, code, self.now())
            .await?;

        let password_hash = hash(new_password.to_string()).await?;
        let updated = within(
            self.store_deadline,
            "users.update_password",
            self.users
                .update_password(&email, &password_hash, &generate_token_hash()),
        )
        .await?;
        if !updated {
            return Err(AuthError::not_found("user not found"));
        }

        info!(email = %email, "Password reset");
        Ok(())
    }

    // =========================================================================
    // Principal reads
    // =========================================================================

    /// Lists all principals.
    ///
    /// # Errors
    ///
    /// Returns an unexpected-category error on store failure.
    pub async fn list_users(&self) -> AuthResult<Vec<Principal>> {
        within(self.store_deadline, "users.list", self.users.list()).await
    }

    /// Looks up a principal by username.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotFound` if the username is unknown.
    pub async fn get_user(&self, username: &str) -> AuthResult<Principal> {
        within(
            self.store_deadline,
            "users.find_by_username",
            self.users.find_by_username(username.trim()),
        )
        .await?
        .ok_or_else(|| AuthError::not_found("user not found"))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_principal(&self, email: &str) -> AuthResult<Principal> {
        within(
            self.store_deadline,
            "users.find_by_email",
            self.users.find_by_email(email),
        )
        .await?
        .ok_or_else(|| AuthError::not_found("user not found"))
    }

    async fn send_code(&self, email: &str, code_type: CodeType) -> AuthResult<()> {
        let ttl = match code_type {
            CodeType::EmailConfirm => self.verification.email_code_lifetime,
            CodeType::PasswordReset => self.verification.reset_code_lifetime,
        };
        let record = self.codes.issue_code(email, code_type, ttl, self.now()).await?;

        let message = MailMessage {
            template: code_type.into(),
            to: email.to_string(),
            email: email.to_string(),
            code: record.code,
        };
        within(self.mail_deadline, "mail.send", self.mailer.send(&message))
            .await
            .inspect_err(|e| error!(email, %code_type, error = %e, "Verification mail not sent"))?;

        info!(email, %code_type, "Verification code sent");
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

fn check_email(email: &str) -> AuthResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AuthError::validation("email address is invalid"))
    }
}

async fn hash(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(e.to_string()))?
        .map_err(|e| AuthError::internal(format!("password hashing failed: {}", e)))
}

async fn check_password(password: &str, hash: &str) -> AuthResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::internal(e.to_string()))?
        .map_err(|e| AuthError::internal(format!("stored password hash is invalid: {}", e)))
}
