//! Bearer token extraction and route guards.
//!
//! Protected routes are wrapped with [`require_route`], which verifies the
//! bearer token against a named route and stores an [`AuthContext`] in the
//! request extensions for the handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use serde::de::DeserializeOwned;

use crate::error::AuthError;
use crate::policy::RequestParams;
use crate::service::AuthService;
use crate::token::AccessClaims;

// =============================================================================
// Auth State
// =============================================================================

/// State shared by the auth handlers.
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

impl AuthState {
    pub fn new(service: AuthService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// =============================================================================
// Auth Context
// =============================================================================

/// Verified caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Arc<AccessClaims>,
}

impl AuthContext {
    #[must_use]
    pub fn username(&self) -> &str {
        &self.claims.username
    }

    #[must_use]
    pub fn role(&self) -> &str {
        &self.claims.role
    }
}

// =============================================================================
// Bearer Token Extractor
// =============================================================================

/// Raw token from an `Authorization: Bearer <token>` header.
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AuthError::authentication("missing Authorization header"))?;

        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| Self(t.to_string()))
            .ok_or_else(|| AuthError::authentication("expected a Bearer token"))
    }
}

// =============================================================================
// Input Extractors
// =============================================================================

/// JSON body whose rejections become `AuthError::Validation`.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AuthError::validation(format!("invalid request body: {}", e.body_text())))?;
        Ok(Self(value))
    }
}

/// Query string whose rejections become `AuthError::Validation`.
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AuthError::validation(format!("invalid query string: {}", e.body_text())))?;
        Ok(Self(value))
    }
}

// =============================================================================
// Route Guard
// =============================================================================

/// Guard state: the auth state plus the route name checked against the role.
#[derive(Clone)]
pub struct RouteGuard {
    pub auth: AuthState,
    pub route: &'static str,
}

impl RouteGuard {
    pub fn new(auth: AuthState, route: &'static str) -> Self {
        Self { auth, route }
    }
}

/// Middleware verifying the bearer token for the guarded route.
///
/// Path and query parameters are merged (path wins) and handed to the
/// identity binding.
///
/// # Errors
///
/// Returns `AuthError::Authentication` without a bearer token, and
/// `AuthError::Authorization` if the token does not grant the route.
pub async fn require_route(
    State(guard): State<RouteGuard>,
    BearerToken(token): BearerToken,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let params = request_params(&mut parts).await;

    let claims = guard
        .auth
        .service
        .verify(&token, guard.route, &params)
        .await?;

    parts.extensions.insert(AuthContext {
        claims: Arc::new(claims),
    });
    Ok(next.run(Request::from_parts(parts, body)).await)
}

async fn request_params(parts: &mut Parts) -> RequestParams {
    let mut params: RequestParams = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map(|Query(query)| query)
        .unwrap_or_default();

    if let Ok(path) = RawPathParams::from_request_parts(parts, &()).await {
        for (key, value) in &path {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}
