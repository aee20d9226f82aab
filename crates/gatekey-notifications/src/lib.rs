//! Mail delivery for gatekey verification codes.
//!
//! Every dispatcher implements [`gatekey_auth::mail::MailDispatcher`]:
//!
//! - [`SmtpMailer`] renders the built-in `{{var}}` templates and relays them
//! - [`SendGridMailer`] posts SendGrid dynamic template messages
//! - [`LogMailer`] only logs, for development

pub mod adapters;
pub mod config;
pub mod error;
pub mod templates;

use std::sync::Arc;

use gatekey_auth::mail::MailDispatcher;

pub use adapters::{LogMailer, SendGridMailer, SmtpMailer};
pub use config::{MailConfig, MailProvider, SendGridConfig, SmtpConfig};
pub use error::NotificationError;
pub use templates::{RenderedContent, Template, TemplateRenderer};

/// Builds the dispatcher selected by `mail.provider`.
pub fn dispatcher_from_config(
    config: &MailConfig,
) -> Result<Arc<dyn MailDispatcher>, NotificationError> {
    config.validate()?;
    let dispatcher: Arc<dyn MailDispatcher> = match config.provider {
        MailProvider::Log => Arc::new(LogMailer),
        MailProvider::Smtp => Arc::new(SmtpMailer::new(config)?),
        MailProvider::SendGrid => Arc::new(SendGridMailer::new(config)?),
    };
    tracing::info!(provider = ?config.provider, "Mail dispatcher ready");
    Ok(dispatcher)
}
