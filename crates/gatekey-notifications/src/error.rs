use gatekey_auth::AuthError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),
}

impl From<NotificationError> for AuthError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::InvalidConfig(message) => AuthError::configuration(message),
            other => AuthError::mail(other.to_string()),
        }
    }
}
