//! # gatekey-auth
//!
//! Token lifecycle and role-based authorization engine with a one-time
//! verification code workflow.
//!
//! This crate provides:
//! - HMAC-signed access and refresh tokens with a rotating key ring
//! - Refresh of expired access tokens against a registered refresh token
//! - Role → route authorization with an optional identity binding
//! - Email confirmation and password reset codes
//! - Axum handlers for the whole surface
//!
//! ## Modules
//!
//! - [`config`] - Token, code, deadline and authorization configuration
//! - [`token`] - Claims, signing keys, issuing and verifying tokens
//! - [`policy`] - Permission sources, identity binding and the engine
//! - [`verification`] - Code generation and the code manager
//! - [`storage`] - Storage traits and the in-memory backend
//! - [`mail`] - Mail dispatch seam
//! - [`service`] - The [`AuthService`] facade
//! - [`http`] - Axum router, extractors and error responses

pub mod config;
pub mod deadline;
pub mod error;
pub mod http;
pub mod mail;
pub mod password;
pub mod policy;
pub mod service;
pub mod storage;
pub mod token;
pub mod types;
pub mod verification;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, CodeRejection, ErrorCategory};
pub use http::{AuthContext, AuthState, router};
pub use mail::{MailDispatcher, MailMessage, MailTemplate};
pub use policy::{AuthorizationEngine, PermissionSource, RouteSet, StaticPermissions};
pub use service::{AuthService, AuthStores, Clock, Registration, TokenPair};
pub use storage::{MemoryStore, RefreshTokenStorage, UserStorage, VerificationCodeStorage};
pub use token::{AccessClaims, Identity, KeyProvider, KeyRing, RefreshClaims, TokenError};
pub use types::{CodeType, NewPrincipal, Principal, VerificationCode};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use gatekey_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, CodeRejection, ErrorCategory};
    pub use crate::mail::{MailDispatcher, MailMessage, MailTemplate};
    pub use crate::policy::{PermissionSource, RouteSet};
    pub use crate::service::{AuthService, AuthStores};
    pub use crate::storage::{RefreshTokenStorage, UserStorage, VerificationCodeStorage};
    pub use crate::token::{KeyProvider, KeyRing};
    pub use crate::types::{CodeType, NewPrincipal, Principal, VerificationCode};
}
