//! Status-change notifications.
//!
//! The check worker only sees the [`Notifier`] trait. [`service::ChannelNotifier`]
//! is the production implementation that fans out to the owner's channels.

pub mod senders;
pub mod service;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::enums::MonitorStatus;
use senders::SenderError;

pub use service::ChannelNotifier;

/// Outcome of delivering to a single channel.
#[derive(Debug)]
pub struct ChannelDelivery {
    pub channel: String,
    pub target: String,
    pub result: Result<(), SenderError>,
}

/// Per-channel outcomes of one notification. Failures in one channel never
/// affect the others.
#[derive(Debug, Default)]
pub struct NotificationReport {
    pub deliveries: Vec<ChannelDelivery>,
}

impl NotificationReport {
    pub fn delivered(&self) -> usize {
        self.deliveries.iter().filter(|d| d.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.deliveries.len() - self.delivered()
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort fan-out of a status change. Never fails the caller; delivery
    /// problems are reported per channel.
    async fn notify(
        &self,
        monitor_id: Uuid,
        new_status: MonitorStatus,
        old_status: MonitorStatus,
    ) -> NotificationReport;
}

/// Builds the human-readable status change line.
pub fn status_change_message(
    monitor_name: &str,
    old_status: MonitorStatus,
    new_status: MonitorStatus,
) -> String {
    format!("Monitor \"{monitor_name}\" status changed from {old_status} to {new_status}")
}
