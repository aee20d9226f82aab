//! HTTP boundary for the auth service.
//!
//! - [`router`] wires every auth endpoint onto an axum `Router`
//! - [`extract`] holds the bearer extractor and the route guard
//! - `IntoResponse` for `AuthError` lives in [`error`]

pub mod error;
pub mod extract;
pub mod handlers;
pub mod types;

use axum::{
    Router, middleware,
    routing::{get, post},
};

pub use extract::{
    AuthContext, AuthState, BearerToken, JsonBody, QueryParams, RouteGuard, require_route,
};
pub use types::{ApiResponse, UserView};

/// Route name checked for `GET /api/users`.
pub const LIST_USERS_ROUTE: &str = "GetAllUsers";
/// Route name checked for `GET /api/users/{username}`.
pub const GET_USER_ROUTE: &str = "GetUser";

/// Builds the auth router.
pub fn router(state: AuthState) -> Router {
    let list_users = Router::new()
        .route("/api/users", get(handlers::list_users_handler))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(state.clone(), LIST_USERS_ROUTE),
            require_route,
        ));

    let get_user = Router::new()
        .route("/api/users/{username}", get(handlers::get_user_handler))
        .route_layer(middleware::from_fn_with_state(
            RouteGuard::new(state.clone(), GET_USER_ROUTE),
            require_route,
        ));

    Router::new()
        .route("/auth/login", post(handlers::login_handler))
        .route("/auth/refresh", post(handlers::refresh_handler))
        .route("/auth/verify", get(handlers::verify_handler))
        .route("/auth/register", post(handlers::register_handler))
        .route(
            "/auth/verify-email",
            post(handlers::request_email_verification_handler)
                .get(handlers::confirm_email_verification_handler),
        )
        .route(
            "/auth/password-reset",
            post(handlers::request_password_reset_handler)
                .get(handlers::verify_password_reset_code_handler),
        )
        .route(
            "/auth/password-reset/confirm",
            post(handlers::confirm_password_reset_handler),
        )
        .merge(list_users)
        .merge(get_user)
        .with_state(state)
}
