use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub mod log_only;
pub mod slack;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(String),
    #[error("Delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers a message to one channel type.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// # Arguments
    ///
    /// * `target` - Channel address: webhook URL, phone number or email address.
    /// * `message` - Plain-text status change message.
    /// * `context` - Values for templated bodies (`monitor_name`, `old_status`, `new_status`, `subject`).
    async fn send(
        &self,
        target: &str,
        message: &str,
        context: &HashMap<String, String>,
    ) -> Result<(), SenderError>;
}
