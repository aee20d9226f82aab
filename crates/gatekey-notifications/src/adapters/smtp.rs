use async_trait::async_trait;
use gatekey_auth::AuthResult;
use gatekey_auth::mail::{MailDispatcher, MailMessage};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::{MailConfig, SmtpConfig};
use crate::error::NotificationError;
use crate::templates::TemplateRenderer;

/// Sends verification codes through an SMTP relay, rendering the built-in
/// templates.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    renderer: TemplateRenderer,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotificationError> {
        Ok(Self {
            transport: build_transport(&config.smtp)?,
            from: sender(config)?,
            renderer: TemplateRenderer::with_defaults(),
        })
    }

    /// Replaces the templates.
    pub fn with_renderer(mut self, renderer: TemplateRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    fn build_message(&self, message: &MailMessage) -> Result<Message, NotificationError> {
        let content = self.renderer.render_message(message)?;
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| NotificationError::SendFailed(format!("Invalid to: {}", e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(content.body)
            .map_err(|e| NotificationError::SendFailed(e.to_string()))
    }
}

fn build_transport(
    config: &SmtpConfig,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotificationError> {
    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?
        .port(config.port);

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }
    Ok(builder.build())
}

fn sender(config: &MailConfig) -> Result<Mailbox, NotificationError> {
    let address = config
        .from
        .parse()
        .map_err(|e| NotificationError::InvalidConfig(format!("Invalid from: {}", e)))?;
    Ok(Mailbox::new(Some(config.from_name.clone()), address))
}

#[async_trait]
impl MailDispatcher for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> AuthResult<()> {
        let email = self.build_message(message)?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        tracing::debug!(
            to = %message.to,
            template = %message.template,
            code = response.code().to_string(),
            "Mail sent via SMTP"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekey_auth::mail::MailTemplate;

    #[tokio::test]
    async fn test_build_message() {
        let mailer = SmtpMailer::new(&MailConfig::default()).unwrap();
        let email = mailer
            .build_message(&MailMessage {
                template: MailTemplate::EmailConfirmation,
                to: "alice@x.com".to_string(),
                email: "alice@x.com".to_string(),
                code: "123456".to_string(),
            })
            .unwrap();

        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("To: alice@x.com"));
        assert!(raw.contains("Subject: Confirm your email address"));
        assert!(raw.contains("123456"));
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let mailer = SmtpMailer::new(&MailConfig::default()).unwrap();
        let err = mailer
            .build_message(&MailMessage {
                template: MailTemplate::PasswordReset,
                to: "not an address".to_string(),
                email: "not an address".to_string(),
                code: "999999".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, NotificationError::SendFailed(_)));
    }
}
