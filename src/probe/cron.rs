use chrono::{DateTime, Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use super::ProbeOutcome;
use crate::db::MonitorRepository;

/// Heartbeat check: the external job is expected to report on its own, so this
/// only judges how old the latest result is.
pub async fn check_cron(
    repository: &dyn MonitorRepository,
    monitor_id: Uuid,
    freshness: Duration,
    now: DateTime<Utc>,
) -> ProbeOutcome {
    let latest = match repository.latest_check_result(monitor_id).await {
        Ok(latest) => latest,
        Err(e) => {
            warn!(%monitor_id, error = %e, "Failed to load last result for cron monitor.");
            return ProbeOutcome::failed(format!("Failed to load last check result: {e}"));
        }
    };

    let Some(last) = latest else {
        return ProbeOutcome::failed("No check results found for cron monitor");
    };

    let age = now - last.checked_at;
    if age <= freshness {
        ProbeOutcome {
            success: true,
            response_time_ms: None,
            status_code: None,
            error_message: None,
        }
    } else {
        ProbeOutcome::failed(format!(
            "Last heartbeat was {}s ago, expected within {}s",
            age.num_seconds(),
            freshness.num_seconds()
        ))
    }
}
