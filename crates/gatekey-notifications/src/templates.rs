use std::collections::HashMap;

use gatekey_auth::mail::{MailMessage, MailTemplate};

use crate::error::NotificationError;

/// Rendered message content
#[derive(Debug, Clone)]
pub struct RenderedContent {
    pub subject: String,
    pub body: String,
}

/// Simple template renderer using {{variable}} syntax
pub struct TemplateRenderer {
    templates: HashMap<String, Template>,
}

#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub subject: String,
    pub body: String,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Renderer holding the built-in verification templates.
    pub fn with_defaults() -> Self {
        let mut renderer = Self::new();
        renderer.register(Template {
            id: MailTemplate::EmailConfirmation.to_string(),
            subject: "Confirm your email address".to_string(),
            body: "Hello,\n\nUse the code {{Code}} to confirm {{Email}}.\n\n\
                   If you did not sign up, ignore this message.\n"
                .to_string(),
        });
        renderer.register(Template {
            id: MailTemplate::PasswordReset.to_string(),
            subject: "Reset your password".to_string(),
            body: "Hello,\n\nUse the code {{Code}} to reset the password of {{Email}}.\n\n\
                   If you did not ask for a reset, ignore this message.\n"
                .to_string(),
        });
        renderer
    }

    pub fn register(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, template_id: &str) -> Option<&Template> {
        self.templates.get(template_id)
    }

    pub fn render(
        &self,
        template_id: &str,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<RenderedContent, NotificationError> {
        let template = self
            .templates
            .get(template_id)
            .ok_or(NotificationError::TemplateNotFound(template_id.to_string()))?;

        Ok(RenderedContent {
            subject: self.render_string(&template.subject, data),
            body: self.render_string(&template.body, data),
        })
    }

    /// Renders the template named by the message with its `Email` and `Code`.
    pub fn render_message(&self, message: &MailMessage) -> Result<RenderedContent, NotificationError> {
        self.render(&message.template.to_string(), &template_data(message))
    }

    fn render_string(&self, template: &str, data: &HashMap<String, serde_json::Value>) -> String {
        let mut result = template.to_string();

        for (key, value) in data {
            let placeholder = format!("{{{{{}}}}}", key);
            let replacement = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Null => String::new(),
                _ => value.to_string(),
            };
            result = result.replace(&placeholder, &replacement);
        }

        result
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Template variables of a verification message.
pub fn template_data(message: &MailMessage) -> HashMap<String, serde_json::Value> {
    HashMap::from([
        ("Email".to_string(), serde_json::json!(message.email)),
        ("Code".to_string(), serde_json::json!(message.code)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(template: MailTemplate) -> MailMessage {
        MailMessage {
            template,
            to: "alice@x.com".to_string(),
            email: "alice@x.com".to_string(),
            code: "123456".to_string(),
        }
    }

    #[test]
    fn test_render_template() {
        let mut renderer = TemplateRenderer::new();
        renderer.register(Template {
            id: "test".to_string(),
            subject: "Hello {{name}}".to_string(),
            body: "You have {{count}} codes".to_string(),
        });

        let mut data = HashMap::new();
        data.insert("name".to_string(), serde_json::json!("John"));
        data.insert("count".to_string(), serde_json::json!(5));

        let result = renderer.render("test", &data).unwrap();
        assert_eq!(result.subject, "Hello John");
        assert_eq!(result.body, "You have 5 codes");
    }

    #[test]
    fn test_default_templates_carry_code() {
        let renderer = TemplateRenderer::with_defaults();

        let confirm = renderer
            .render_message(&message(MailTemplate::EmailConfirmation))
            .unwrap();
        assert!(confirm.body.contains("123456"));
        assert!(confirm.body.contains("alice@x.com"));

        let reset = renderer
            .render_message(&message(MailTemplate::PasswordReset))
            .unwrap();
        assert_eq!(reset.subject, "Reset your password");
        assert!(!reset.body.contains("{{"));
    }

    #[test]
    fn test_template_not_found() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render_message(&message(MailTemplate::PasswordReset));
        assert!(matches!(
            result,
            Err(NotificationError::TemplateNotFound(_))
        ));
    }
}
