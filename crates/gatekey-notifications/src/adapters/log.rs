use async_trait::async_trait;
use gatekey_auth::AuthResult;
use gatekey_auth::mail::{MailDispatcher, MailMessage};

/// Development dispatcher: writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl MailDispatcher for LogMailer {
    async fn send(&self, message: &MailMessage) -> AuthResult<()> {
        tracing::info!(
            to = %message.to,
            template = %message.template,
            code = %message.code,
            "Mail not sent (log provider)"
        );
        Ok(())
    }
}
