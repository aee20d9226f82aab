//! Authorization decision engine.
//!
//! The engine answers two questions:
//!
//! - [`AuthorizationEngine::is_authorized_for`]: may this role invoke this
//!   named route?
//! - [`AuthorizationEngine::verify`]: does this bearer token grant access to
//!   this route for this request?
//!
//! # Example
//!
//! ```ignore
//! let engine = AuthorizationEngine::new(verifier, Arc::new(permissions))
//!     .with_binding(Arc::new(ParamBinding::new("username")));
//!
//! let claims = engine.verify(&token, "GetUser", &params, OffsetDateTime::now_utc()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::deadline::within;
use crate::policy::binding::{AllowAll, RequestBinding, RequestParams};
use crate::policy::source::PermissionSource;
use crate::token::{AccessClaims, TokenVerifier};
use crate::{AuthError, AuthResult};

/// Role subject to the identity binding check.
pub const USER_ROLE: &str = "user";

const DEFAULT_LOOKUP_DEADLINE: Duration = Duration::from_secs(5);

/// Decides whether a token or role may use a named route.
#[derive(Clone)]
pub struct AuthorizationEngine {
    verifier: TokenVerifier,
    source: Arc<dyn PermissionSource>,
    binding: Arc<dyn RequestBinding>,
    lookup_deadline: Duration,
}

impl AuthorizationEngine {
    /// Creates an engine with the permissive default binding.
    #[must_use]
    pub fn new(verifier: TokenVerifier, source: Arc<dyn PermissionSource>) -> Self {
        Self {
            verifier,
            source,
            binding: Arc::new(AllowAll),
            lookup_deadline: DEFAULT_LOOKUP_DEADLINE,
        }
    }

    /// Replaces the identity binding applied to "user" tokens.
    #[must_use]
    pub fn with_binding(mut self, binding: Arc<dyn RequestBinding>) -> Self {
        self.binding = binding;
        self
    }

    /// Sets the deadline for permission lookups.
    #[must_use]
    pub fn with_lookup_deadline(mut self, deadline: Duration) -> Self {
        self.lookup_deadline = deadline;
        self
    }

    /// Returns `true` if `role` may invoke `route`.
    ///
    /// # Errors
    ///
    /// Returns an unexpected-category error if the permission source fails or
    /// does not answer in time.
    pub async fn is_authorized_for(&self, role: &str, route: &str) -> AuthResult<bool> {
        within(
            self.lookup_deadline,
            "permissions.lookup",
            self.source.lookup(role, route),
        )
        .await
    }

    /// Verifies `token` and checks that its role may invoke `route`.
    ///
    /// Returns the token claims on success.
    ///
    /// # Errors
    ///
    /// - `AuthError::Authorization` if the token is malformed, forged or
    ///   expired, if a "user" token fails the identity binding, or if the
    ///   role is not granted the route.
    /// - An unexpected-category error if the permission lookup fails.
    pub async fn verify(
        &self,
        token: &str,
        route: &str,
        params: &RequestParams,
        now: OffsetDateTime,
    ) -> AuthResult<AccessClaims> {
        let claims = self.verifier.parse_access(token, now).map_err(|e| {
            debug!(error = %e, route, "Rejected bearer token");
            AuthError::authorization(e.to_string())
        })?;

        if claims.role == USER_ROLE && !self.binding.is_request_verified(&claims, params) {
            warn!(username = %claims.username, route, "Request not bound to token identity");
            return Err(AuthError::authorization(
                "request not verified with the token claims",
            ));
        }

        if !self.is_authorized_for(&claims.role, route).await? {
            warn!(username = %claims.username, role = %claims.role, route, "Route not permitted");
            return Err(AuthError::authorization(format!(
                "{} role is not authorized",
                claims.role
            )));
        }

        debug!(username = %claims.username, route, "Route authorized");
        Ok(claims)
    }
}
