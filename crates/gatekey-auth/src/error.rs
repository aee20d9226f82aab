//! Authentication and authorization error types.
//!
//! Every fallible core operation returns [`AuthError`]. The variants fall into
//! five categories (see [`ErrorCategory`]); the HTTP layer maps each category
//! to a fixed status code and a message that never carries internal causes.

use std::fmt;

use crate::token::TokenError;

/// Reasons a supplied verification code is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeRejection {
    /// No code is stored for the email and purpose.
    NotFound,
    /// The stored code expired; it has been removed.
    Expired,
    /// The supplied code differs from the stored one.
    Mismatch,
}

impl fmt::Display for CodeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "verification code not found"),
            Self::Expired => write!(f, "verification code has expired, request a new one"),
            Self::Mismatch => write!(f, "verification code is invalid"),
        }
    }
}

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad credentials, or a token that is malformed, forged or expired.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Description of why authentication failed.
        message: String,
    },

    /// The identity is valid but not allowed to perform the action.
    #[error("Authorization failed: {message}")]
    Authorization {
        /// Description of why access was denied.
        message: String,
    },

    /// An unknown principal or resource.
    #[error("Not found: {message}")]
    NotFound {
        /// What was not found.
        message: String,
    },

    /// The request payload is malformed or violates an input rule.
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the violated rule.
        message: String,
    },

    /// A verification code was refused.
    #[error("Code rejected: {reason}")]
    CodeRejected {
        /// Why the code was refused.
        reason: CodeRejection,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The mail dispatcher failed to deliver a message.
    #[error("Mail error: {message}")]
    Mail {
        /// Description of the delivery error.
        message: String,
    },

    /// Token signing failed, usually because of key misconfiguration.
    #[error("Signing error: {message}")]
    Signing {
        /// Description of the signing error.
        message: String,
    },

    /// A store or mail call did not finish within its deadline.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Authentication` error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new `Authorization` error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `CodeRejected` error.
    #[must_use]
    pub fn code_rejected(reason: CodeRejection) -> Self {
        Self::CodeRejected { reason }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Mail` error.
    #[must_use]
    pub fn mail(message: impl Into<String>) -> Self {
        Self::Mail {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller is at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.category() == ErrorCategory::Unexpected
    }

    /// Returns `true` if this is an authentication error.
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is an authorization error.
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        matches!(self, Self::Authorization { .. })
    }

    /// Returns the code rejection reason, if this error carries one.
    #[must_use]
    pub fn code_rejection(&self) -> Option<CodeRejection> {
        match self {
            Self::CodeRejected { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Returns the error category for logging and response mapping.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::CodeRejected {
                reason: CodeRejection::NotFound,
            } => ErrorCategory::NotFound,
            Self::Validation { .. } | Self::CodeRejected { .. } => ErrorCategory::Validation,
            Self::Storage { .. }
            | Self::Mail { .. }
            | Self::Signing { .. }
            | Self::Timeout { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => ErrorCategory::Unexpected,
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication_failed",
            Self::Authorization { .. } => "access_denied",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "invalid_request",
            Self::CodeRejected { reason } => match reason {
                CodeRejection::NotFound => "code_not_found",
                CodeRejection::Expired => "code_expired",
                CodeRejection::Mismatch => "code_mismatch",
            },
            Self::Storage { .. }
            | Self::Mail { .. }
            | Self::Signing { .. }
            | Self::Timeout { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(message) => Self::Signing { message },
            other => Self::Authentication {
                message: other.to_string(),
            },
        }
    }
}

/// Categories of errors, one per response class at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity could not be established.
    Authentication,
    /// Identity established but access refused.
    Authorization,
    /// Unknown principal or verification record.
    NotFound,
    /// Malformed input or refused code.
    Validation,
    /// Store, mail, signing or timeout failures.
    Unexpected,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}
