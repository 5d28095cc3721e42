use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::senders::{NotificationSender, SenderError, log_only::LogSender, slack::SlackSender};
use super::{ChannelDelivery, NotificationReport, Notifier, status_change_message};
use crate::db::MonitorRepository;
use crate::db::enums::{AlertType, MonitorStatus};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends status changes to the owner's verified integrations and, always, to
/// the owner's email address.
pub struct ChannelNotifier {
    repository: Arc<dyn MonitorRepository>,
    email: Box<dyn NotificationSender>,
    sms: Box<dyn NotificationSender>,
    slack: Box<dyn NotificationSender>,
    /// Upper bound for a single channel delivery.
    delivery_timeout: Duration,
}

impl ChannelNotifier {
    /// Builds the production channels. Webhook requests share one client whose
    /// timeout matches `delivery_timeout`.
    pub fn new(
        repository: Arc<dyn MonitorRepository>,
        delivery_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(delivery_timeout)
            .build()?;
        Ok(Self::with_senders(
            repository,
            Box::new(LogSender::email()),
            Box::new(LogSender::sms()),
            Box::new(SlackSender::new(http_client)),
        )
        .with_delivery_timeout(delivery_timeout))
    }

    pub fn with_senders(
        repository: Arc<dyn MonitorRepository>,
        email: Box<dyn NotificationSender>,
        sms: Box<dyn NotificationSender>,
        slack: Box<dyn NotificationSender>,
    ) -> Self {
        Self {
            repository,
            email,
            sms,
            slack,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_delivery_timeout(mut self, delivery_timeout: Duration) -> Self {
        self.delivery_timeout = delivery_timeout;
        self
    }

    fn sender_for(&self, alert_type: AlertType) -> &dyn NotificationSender {
        match alert_type {
            AlertType::Sms => self.sms.as_ref(),
            AlertType::Slack => self.slack.as_ref(),
        }
    }

    async fn deliver(
        &self,
        channel: String,
        sender: &dyn NotificationSender,
        target: String,
        message: &str,
        context: &HashMap<String, String>,
    ) -> ChannelDelivery {
        let result =
            match tokio::time::timeout(self.delivery_timeout, sender.send(&target, message, context))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SenderError::Timeout(self.delivery_timeout)),
            };
        if let Err(e) = &result {
            error!(channel = %channel, target = %target, error = %e, "Failed to send notification.");
        }
        ChannelDelivery {
            channel,
            target,
            result,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(
        &self,
        monitor_id: Uuid,
        new_status: MonitorStatus,
        old_status: MonitorStatus,
    ) -> NotificationReport {
        if new_status == old_status {
            return NotificationReport::default();
        }

        let targets = match self.repository.notification_targets(monitor_id).await {
            Ok(Some(targets)) => targets,
            Ok(None) => {
                warn!(%monitor_id, "Monitor not found, skipping notifications.");
                return NotificationReport::default();
            }
            Err(e) => {
                error!(%monitor_id, error = %e, "Failed to load notification targets.");
                return NotificationReport::default();
            }
        };

        let monitor_name = targets.owner.monitor_name.as_str();
        let message = status_change_message(monitor_name, old_status, new_status);
        info!(%monitor_id, %old_status, %new_status, "Sending status change notifications.");

        let mut context = HashMap::new();
        context.insert("monitor_name".to_string(), monitor_name.to_string());
        context.insert("old_status".to_string(), old_status.to_string());
        context.insert("new_status".to_string(), new_status.to_string());

        let mut email_context = context.clone();
        email_context.insert(
            "subject".to_string(),
            format!("UptimeKite Monitor Status Change: {monitor_name}"),
        );
        let email_body = format!(
            "Hello {monitor_name},\n\nYour monitor \"{monitor_name}\" status has changed from {old_status} to {new_status}.\n\nBest regards,\nUptimeKite Team"
        );

        let mut pending = Vec::with_capacity(targets.integrations.len() + 1);
        for integration in &targets.integrations {
            pending.push(self.deliver(
                integration.alert_type.to_string(),
                self.sender_for(integration.alert_type),
                integration.target.clone(),
                &message,
                &context,
            ));
        }
        pending.push(self.deliver(
            "email".to_string(),
            self.email.as_ref(),
            targets.owner.email.clone(),
            &email_body,
            &email_context,
        ));

        NotificationReport {
            deliveries: join_all(pending).await,
        }
    }
}
