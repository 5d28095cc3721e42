use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{AlertType, MonitorKind, MonitorStatus};

/// A target watched on a fixed interval.
/// Corresponds to the `monitors` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Monitor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub monitor_type: MonitorKind,
    pub target: String, // URL for http, logical job name for cron
    pub interval_seconds: i32,
    pub status: MonitorStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One probe execution. Rows are append-only.
/// Corresponds to the `check_results` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CheckResult {
    pub id: i64,
    pub monitor_id: Uuid,
    pub status_code: Option<i32>,
    pub response_time_ms: Option<i32>,
    pub was_successful: bool,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Insert payload for `check_results`; `checked_at` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckResult {
    pub monitor_id: Uuid,
    pub status_code: Option<i32>,
    pub response_time_ms: Option<i32>,
    pub was_successful: bool,
    pub error_message: Option<String>,
}

/// A user-configured delivery channel.
/// Corresponds to the `alert_integrations` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertIntegration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub target: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Monitor name and owner contact details, joined from `monitors` and `users`.
#[derive(Debug, Clone, FromRow)]
pub struct MonitorOwner {
    pub monitor_name: String,
    pub user_id: Uuid,
    pub email: String,
}

/// Everything the notifier needs to fan out one status change.
#[derive(Debug, Clone)]
pub struct NotificationTargets {
    pub owner: MonitorOwner,
    pub integrations: Vec<AlertIntegration>,
}
