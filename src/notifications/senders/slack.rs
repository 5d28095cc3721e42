use async_trait::async_trait;
use reqwest::{Client, header};
use std::collections::HashMap;
use tera::{Context, Tera};

use super::{NotificationSender, SenderError};

const DEFAULT_BODY_TEMPLATE: &str = r#"{"text": {{ message | json_encode() | safe }}}"#;

/// Posts to a Slack incoming webhook.
pub struct SlackSender {
    client: Client,
    body_template: String,
}

impl SlackSender {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            body_template: DEFAULT_BODY_TEMPLATE.to_string(),
        }
    }

    pub fn with_body_template(mut self, template: impl Into<String>) -> Self {
        self.body_template = template.into();
        self
    }

    fn render_body(
        &self,
        message: &str,
        context: &HashMap<String, String>,
    ) -> Result<String, SenderError> {
        let mut tera_context = Context::new();
        for (key, value) in context {
            tera_context.insert(key, value);
        }
        tera_context.insert("message", message);
        Tera::one_off(&self.body_template, &tera_context, false)
            .map_err(|e| SenderError::TemplatingError(e.to_string()))
    }
}

#[async_trait]
impl NotificationSender for SlackSender {
    async fn send(
        &self,
        target: &str,
        message: &str,
        context: &HashMap<String, String>,
    ) -> Result<(), SenderError> {
        let body = self.render_body(message, context)?;
        let response = self
            .client
            .post(target)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_body_escapes_message() {
        let sender = SlackSender::new(Client::new());
        let body = sender
            .render_body(r#"Monitor "api" status changed from up to down"#, &HashMap::new())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["text"], r#"Monitor "api" status changed from up to down"#);
    }

    #[test]
    fn test_custom_template_uses_context() {
        let sender = SlackSender::new(Client::new())
            .with_body_template(r#"{"text": "{{ monitor_name }} is {{ new_status }}"}"#);
        let mut context = HashMap::new();
        context.insert("monitor_name".to_string(), "api".to_string());
        context.insert("new_status".to_string(), "down".to_string());

        let body = sender.render_body("ignored", &context).unwrap();
        assert_eq!(body, r#"{"text": "api is down"}"#);
    }
}
