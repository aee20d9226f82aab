//! Axum handlers for the auth endpoints.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AuthResult;
use crate::service::Registration;

use super::extract::{AuthContext, AuthState, JsonBody, QueryParams};
use super::types::{
    ApiResponse, CodeQuery, EmailRequest, LoginRequest, PasswordResetConfirmRequest,
    RefreshRequest, RegisterRequest, UserView, VerifyQuery, VerifyResponse,
};

// =============================================================================
// Tokens
// =============================================================================

/// `POST /auth/login`
pub async fn login_handler(
    State(state): State<AuthState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    let tokens = state
        .service
        .login(&request.username, &request.password)
        .await?;
    Ok(Json(ApiResponse::ok("login succeeded", tokens)))
}

/// `POST /auth/refresh`
pub async fn refresh_handler(
    State(state): State<AuthState>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> AuthResult<impl IntoResponse> {
    let token = state
        .service
        .refresh(&request.access_token, &request.refresh_token)
        .await?;
    Ok(Json(ApiResponse::ok("access token refreshed", token)))
}

/// `GET /auth/verify?token=..&routeName=..`
pub async fn verify_handler(
    State(state): State<AuthState>,
    QueryParams(query): QueryParams<VerifyQuery>,
    QueryParams(mut params): QueryParams<HashMap<String, String>>,
) -> AuthResult<impl IntoResponse> {
    params.remove("token");
    params.remove("routeName");

    state
        .service
        .verify(&query.token, &query.route_name, &params)
        .await?;
    Ok(Json(ApiResponse::ok(
        "request authorized",
        VerifyResponse {
            is_authorized: true,
        },
    )))
}

// =============================================================================
// Registration and email verification
// =============================================================================

/// `POST /auth/register`
pub async fn register_handler(
    State(state): State<AuthState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AuthResult<impl IntoResponse> {
    let principal = state
        .service
        .register(Registration {
            username: request.username,
            email: request.email,
            password: request.password,
            role: request.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "please verify your email using the code sent to your mailbox",
            UserView::from(principal),
        )),
    ))
}

/// `POST /auth/verify-email`
pub async fn request_email_verification_handler(
    State(state): State<AuthState>,
    JsonBody(request): JsonBody<EmailRequest>,
) -> AuthResult<impl IntoResponse> {
    state
        .service
        .request_email_verification(&request.email)
        .await?;
    Ok(Json(ApiResponse::message(
        "a verification code was sent to your mailbox",
    )))
}

/// `GET /auth/verify-email?email=..&code=..`
pub async fn confirm_email_verification_handler(
    State(state): State<AuthState>,
    QueryParams(query): QueryParams<CodeQuery>,
) -> AuthResult<impl IntoResponse> {
    state
        .service
        .confirm_email_verification(&query.email, &query.code)
        .await?;
    Ok(Json(ApiResponse::message("email verification succeeded")))
}

// =============================================================================
// Password reset
// =============================================================================

/// `POST /auth/password-reset`
pub async fn request_password_reset_handler(
    State(state): State<AuthState>,
    JsonBody(request): JsonBody<EmailRequest>,
) -> AuthResult<impl IntoResponse> {
    state.service.request_password_reset(&request.email).await?;
    Ok(Json(ApiResponse::message(
        "please check your mailbox for the password reset code",
    )))
}

/// `GET /auth/password-reset?email=..&code=..`
pub async fn verify_password_reset_code_handler(
    State(state): State<AuthState>,
    QueryParams(query): QueryParams<CodeQuery>,
) -> AuthResult<impl IntoResponse> {
    state
        .service
        .verify_password_reset_code(&query.email, &query.code)
        .await?;
    Ok(Json(ApiResponse::message(
        "password reset code verification succeeded",
    )))
}

/// `POST /auth/password-reset/confirm`
pub async fn confirm_password_reset_handler(
    State(state): State<AuthState>,
    JsonBody(request): JsonBody<PasswordResetConfirmRequest>,
) -> AuthResult<impl IntoResponse> {
    state
        .service
        .confirm_password_reset(
            &request.email,
            &request.code,
            &request.password,
            &request.confirm_password,
        )
        .await?;
    Ok(Json(ApiResponse::message("password updated")))
}

// =============================================================================
// Users
// =============================================================================

/// `GET /api/users`, guarded by the `GetAllUsers` route.
pub async fn list_users_handler(
    State(state): State<AuthState>,
    Extension(auth): Extension<AuthContext>,
) -> AuthResult<impl IntoResponse> {
    tracing::debug!(caller = %auth.username(), "Listing users");
    let users: Vec<UserView> = state
        .service
        .list_users()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(Json(ApiResponse::ok("users", users)))
}

/// `GET /api/users/{username}`, guarded by the `GetUser` route.
pub async fn get_user_handler(
    State(state): State<AuthState>,
    Path(username): Path<String>,
) -> AuthResult<impl IntoResponse> {
    let user = state.service.get_user(&username).await?;
    Ok(Json(ApiResponse::ok("user", UserView::from(user))))
}
