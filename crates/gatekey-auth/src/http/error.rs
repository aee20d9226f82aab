//! Error response handling for the HTTP boundary.
//!
//! This module implements `IntoResponse` for `AuthError`. Client errors echo
//! their message; unexpected causes are logged and replaced by a generic
//! message.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::{AuthError, ErrorCategory};

const GENERIC_FAILURE: &str = "Something went wrong, please try again later";

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = error_details(&self);

        if self.category() == ErrorCategory::Unexpected {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = json!({
            "status": false,
            "error": self.error_code(),
            "message": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(self.error_code(), &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Extracts the HTTP status and the client-safe message from an `AuthError`.
fn error_details(error: &AuthError) -> (StatusCode, String) {
    match error {
        AuthError::Authentication { message } => (StatusCode::UNAUTHORIZED, message.clone()),
        AuthError::Authorization { message } => (StatusCode::FORBIDDEN, message.clone()),
        AuthError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),
        AuthError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AuthError::CodeRejected { reason } => (StatusCode::NOT_ACCEPTABLE, reason.to_string()),
        AuthError::Storage { .. }
        | AuthError::Timeout { .. }
        | AuthError::Mail { .. }
        | AuthError::Signing { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            GENERIC_FAILURE.to_string(),
        ),
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="gatekey", error="...", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!(
        "Bearer realm=\"gatekey\", error=\"{}\", error_description=\"{}\"",
        error, escaped_desc
    )
}

// =============================================================================
// Tests
// =============================================================================
