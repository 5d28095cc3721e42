use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use super::{NotificationSender, SenderError};

/// Channel without a delivery backend yet; records the message in the log.
pub struct LogSender {
    channel: &'static str,
}

impl LogSender {
    pub fn email() -> Self {
        Self { channel: "email" }
    }

    pub fn sms() -> Self {
        Self { channel: "sms" }
    }
}

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(
        &self,
        target: &str,
        message: &str,
        context: &HashMap<String, String>,
    ) -> Result<(), SenderError> {
        info!(
            channel = self.channel,
            target,
            subject = context.get("subject").map(String::as_str).unwrap_or_default(),
            "Notification (no delivery backend): {}",
            message
        );
        Ok(())
    }
}
