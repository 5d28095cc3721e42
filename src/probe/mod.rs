//! Executes a single check against a monitor's target.

pub mod cron;
pub mod http;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::enums::MonitorKind;
use crate::db::models::NewCheckResult;
use crate::db::MonitorRepository;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CRON_FRESHNESS: Duration = Duration::from_secs(120);

/// Result of one probe. On failure exactly one of `status_code` (the target
/// answered with an error status) or `error_message` (it did not answer usably)
/// is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub success: bool,
    pub response_time_ms: Option<i32>,
    pub status_code: Option<i32>,
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            response_time_ms: None,
            status_code: None,
            error_message: Some(message.into()),
        }
    }

    pub fn to_record(&self, monitor_id: Uuid) -> NewCheckResult {
        NewCheckResult {
            monitor_id,
            status_code: self.status_code,
            response_time_ms: self.response_time_ms,
            was_successful: self.success,
            error_message: self.error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub http_timeout: Duration,
    pub cron_freshness: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cron_freshness: DEFAULT_CRON_FRESHNESS,
        }
    }
}

/// Dispatches probes by monitor kind. The HTTP client is shared across all
/// concurrent checks.
pub struct Prober {
    client: reqwest::Client,
    repository: Arc<dyn MonitorRepository>,
    cron_freshness: chrono::Duration,
}

impl Prober {
    pub fn new(
        repository: Arc<dyn MonitorRepository>,
        settings: ProbeSettings,
    ) -> Result<Self, reqwest::Error> {
        let client = http::build_client(settings.http_timeout)?;
        let cron_freshness = chrono::Duration::from_std(settings.cron_freshness)
            .unwrap_or_else(|_| chrono::Duration::seconds(120));
        Ok(Self {
            client,
            repository,
            cron_freshness,
        })
    }

    pub async fn probe(&self, kind: MonitorKind, target: &str, monitor_id: Uuid) -> ProbeOutcome {
        match kind {
            MonitorKind::Http => http::check_http(&self.client, target).await,
            MonitorKind::Cron => {
                cron::check_cron(
                    self.repository.as_ref(),
                    monitor_id,
                    self.cron_freshness,
                    Utc::now(),
                )
                .await
            }
        }
    }
}
