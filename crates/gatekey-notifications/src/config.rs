//! Mail configuration.
//!
//! ```toml
//! [mail]
//! provider = "sendgrid"
//! from = "no-reply@example.com"
//!
//! [mail.sendgrid]
//! email_confirmation_template_id = "d-123"
//! password_reset_template_id = "d-456"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// Which dispatcher delivers verification codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    /// Log messages instead of sending them.
    #[default]
    Log,
    Smtp,
    SendGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub provider: MailProvider,

    /// Sender address.
    pub from: String,

    /// Sender display name.
    pub from_name: String,

    pub smtp: SmtpConfig,

    pub sendgrid: SendGridConfig,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: MailProvider::Log,
            from: "no-reply@gatekey.local".to_string(),
            from_name: "gatekey".to_string(),
            smtp: SmtpConfig::default(),
            sendgrid: SendGridConfig::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 587,
            username: None,
            password: None,
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SendGridConfig {
    /// API key given inline. Prefer `api_key_env`.
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    pub base_url: String,

    pub email_confirmation_template_id: String,

    pub password_reset_template_id: String,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "SENDGRID_API_KEY".to_string(),
            base_url: "https://api.sendgrid.com".to_string(),
            email_confirmation_template_id: String::new(),
            password_reset_template_id: String::new(),
        }
    }
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field(
                "email_confirmation_template_id",
                &self.email_confirmation_template_id,
            )
            .field("password_reset_template_id", &self.password_reset_template_id)
            .finish()
    }
}

impl SendGridConfig {
    /// Inline key if set, otherwise the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<String, NotificationError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env).map_err(|_| {
            NotificationError::InvalidConfig(format!(
                "SendGrid API key missing: set mail.sendgrid.api_key or {}",
                self.api_key_env
            ))
        })
    }
}

impl MailConfig {
    /// Checks the settings of the selected provider.
    pub fn validate(&self) -> Result<(), NotificationError> {
        if !self.from.contains('@') {
            return Err(NotificationError::InvalidConfig(
                "mail.from must be an email address".into(),
            ));
        }
        match self.provider {
            MailProvider::Log => Ok(()),
            MailProvider::Smtp => {
                if self.smtp.host.trim().is_empty() {
                    return Err(NotificationError::InvalidConfig(
                        "mail.smtp.host is required".into(),
                    ));
                }
                if self.smtp.username.is_some() != self.smtp.password.is_some() {
                    return Err(NotificationError::InvalidConfig(
                        "mail.smtp.username and mail.smtp.password go together".into(),
                    ));
                }
                Ok(())
            }
            MailProvider::SendGrid => {
                if self.sendgrid.email_confirmation_template_id.is_empty()
                    || self.sendgrid.password_reset_template_id.is_empty()
                {
                    return Err(NotificationError::InvalidConfig(
                        "mail.sendgrid template ids are required".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_log() {
        let config = MailConfig::default();
        assert_eq!(config.provider, MailProvider::Log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sendgrid_requires_templates() {
        let config = MailConfig {
            provider: MailProvider::SendGrid,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smtp_credentials_pair() {
        let mut config = MailConfig {
            provider: MailProvider::Smtp,
            ..Default::default()
        };
        config.smtp.username = Some("mailer".to_string());
        assert!(config.validate().is_err());

        config.smtp.password = Some("hunter2".to_string());
        assert!(config.validate().is_ok());
        assert!(!format!("{:?}", config.smtp).contains("hunter2"));
    }

    #[test]
    fn test_provider_names() {
        let config: MailConfig = serde_json::from_str(r#"{"provider": "sendgrid"}"#).unwrap();
        assert_eq!(config.provider, MailProvider::SendGrid);
    }
}
