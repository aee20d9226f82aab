use async_trait::async_trait;
use gatekey_auth::AuthResult;
use gatekey_auth::mail::{MailDispatcher, MailMessage, MailTemplate};
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::MailConfig;
use crate::error::NotificationError;
use crate::templates::template_data;

/// Sends verification codes as SendGrid dynamic template messages.
///
/// Template data carries `Email` and `Code`.
pub struct SendGridMailer {
    http_client: Client,
    endpoint: String,
    api_key: String,
    from: String,
    from_name: String,
    email_confirmation_template_id: String,
    password_reset_template_id: String,
}

impl SendGridMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotificationError> {
        let sendgrid = &config.sendgrid;
        Ok(Self {
            http_client: Client::new(),
            endpoint: format!("{}/v3/mail/send", sendgrid.base_url.trim_end_matches('/')),
            api_key: sendgrid.resolve_api_key()?,
            from: config.from.clone(),
            from_name: config.from_name.clone(),
            email_confirmation_template_id: sendgrid.email_confirmation_template_id.clone(),
            password_reset_template_id: sendgrid.password_reset_template_id.clone(),
        })
    }

    fn template_id(&self, template: MailTemplate) -> &str {
        match template {
            MailTemplate::EmailConfirmation => &self.email_confirmation_template_id,
            MailTemplate::PasswordReset => &self.password_reset_template_id,
        }
    }

    fn body(&self, message: &MailMessage) -> Value {
        json!({
            "personalizations": [{
                "to": [{"email": message.to}],
                "dynamic_template_data": template_data(message),
            }],
            "from": {"email": self.from, "name": self.from_name},
            "template_id": self.template_id(message.template),
        })
    }

    async fn post(&self, message: &MailMessage) -> Result<(), NotificationError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.body(message))
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let message_id = response
                .headers()
                .get("x-message-id")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            tracing::debug!(
                to = %message.to,
                template = %message.template,
                message_id = ?message_id,
                "Mail accepted by SendGrid"
            );
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl MailDispatcher for SendGridMailer {
    async fn send(&self, message: &MailMessage) -> AuthResult<()> {
        self.post(message).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailProvider;

    fn config() -> MailConfig {
        let mut config = MailConfig {
            provider: MailProvider::SendGrid,
            ..Default::default()
        };
        config.sendgrid.api_key = Some("SG.test".to_string());
        config.sendgrid.email_confirmation_template_id = "d-confirm".to_string();
        config.sendgrid.password_reset_template_id = "d-reset".to_string();
        config
    }

    #[test]
    fn test_body_uses_dynamic_template() {
        let mailer = SendGridMailer::new(&config()).unwrap();
        let body = mailer.body(&MailMessage {
            template: MailTemplate::PasswordReset,
            to: "bob@x.com".to_string(),
            email: "bob@x.com".to_string(),
            code: "999999".to_string(),
        });

        assert_eq!(body["template_id"], "d-reset");
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "bob@x.com");
        assert_eq!(
            body["personalizations"][0]["dynamic_template_data"]["Code"],
            "999999"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = config();
        config.sendgrid.api_key = None;
        config.sendgrid.api_key_env = "GATEKEY_TEST_UNSET_SENDGRID_KEY".to_string();
        assert!(matches!(
            SendGridMailer::new(&config),
            Err(NotificationError::InvalidConfig(_))
        ));
    }
}
