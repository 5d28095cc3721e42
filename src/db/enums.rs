use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a monitor watches. Stored as the `monitor_type` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "monitor_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    Http,
    Cron,
}

impl MonitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorKind::Http => "http",
            MonitorKind::Cron => "cron",
        }
    }
}

impl FromStr for MonitorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(MonitorKind::Http),
            "cron" => Ok(MonitorKind::Cron),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current health of a monitor.
///
/// `Pending` is the initial state and stays until the first check result.
/// `Paused` is only ever set or cleared by the owner, never by the check pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "monitor_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Pending,
    Up,
    Down,
    Paused,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorStatus::Pending => "pending",
            MonitorStatus::Up => "up",
            MonitorStatus::Down => "down",
            MonitorStatus::Paused => "paused",
        }
    }

    /// Status that a finished probe drives the monitor into.
    pub fn from_probe_success(success: bool) -> Self {
        if success {
            MonitorStatus::Up
        } else {
            MonitorStatus::Down
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Sms,
    Slack,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::Sms => f.write_str("sms"),
            AlertType::Slack => f.write_str("slack"),
        }
    }
}
