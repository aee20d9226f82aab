//! Outbound mail seam.
//!
//! The core only needs to hand a code to a mailbox. Delivery is implemented
//! by `gatekey-notifications`; [`Outbox`] keeps messages in memory.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::CodeType;
use crate::{AuthError, AuthResult};

/// Which message template to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    EmailConfirmation,
    PasswordReset,
}

impl From<CodeType> for MailTemplate {
    fn from(code_type: CodeType) -> Self {
        match code_type {
            CodeType::EmailConfirm => Self::EmailConfirmation,
            CodeType::PasswordReset => Self::PasswordReset,
        }
    }
}

impl fmt::Display for MailTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailConfirmation => write!(f, "email_confirmation"),
            Self::PasswordReset => write!(f, "password_reset"),
        }
    }
}

/// A verification code message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub template: MailTemplate,
    /// Recipient address.
    pub to: String,
    /// Template data.
    pub email: String,
    /// Template data.
    pub code: String,
}

/// Sends verification code messages.
#[async_trait]
pub trait MailDispatcher: Send + Sync {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Mail` if the provider refuses or cannot be reached.
    async fn send(&self, message: &MailMessage) -> AuthResult<()>;
}

/// Dispatcher that records messages instead of sending them.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<MailMessage>>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far.
    #[must_use]
    pub fn messages(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// The most recent message sent to `to`.
    #[must_use]
    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.messages().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl MailDispatcher for Outbox {
    async fn send(&self, message: &MailMessage) -> AuthResult<()> {
        self.sent
            .lock()
            .map_err(|_| AuthError::internal("outbox lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}
