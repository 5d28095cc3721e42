use tracing::{info, warn};
use uuid::Uuid;

use crate::db::enums::MonitorStatus;
use crate::db::{MonitorRepository, RepositoryError};
use crate::notifications::Notifier;

/// What applying a probe-derived status did to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The monitor was deleted while the check was in flight.
    MonitorMissing,
    /// The owner paused the monitor while the check was in flight; left paused.
    Paused,
    Unchanged(MonitorStatus),
    Changed {
        from: MonitorStatus,
        to: MonitorStatus,
    },
}

/// Reads the stored status, overwrites it (last writer wins) and notifies once
/// the write has succeeded if the status actually changed.
///
/// Notification problems are logged and never turn into an error here.
pub async fn apply_status(
    repository: &dyn MonitorRepository,
    notifier: &dyn Notifier,
    monitor_id: Uuid,
    new_status: MonitorStatus,
) -> Result<StatusChange, RepositoryError> {
    let Some(monitor) = repository.get_monitor(monitor_id).await? else {
        warn!(%monitor_id, "Monitor not found, skipping status update.");
        return Ok(StatusChange::MonitorMissing);
    };
    let old_status = monitor.status;

    if old_status == MonitorStatus::Paused {
        info!(%monitor_id, "Monitor is paused, leaving status untouched.");
        return Ok(StatusChange::Paused);
    }

    if !repository.update_status(monitor_id, new_status).await? {
        warn!(%monitor_id, "Monitor deleted before its status could be written.");
        return Ok(StatusChange::MonitorMissing);
    }
    info!(%monitor_id, %old_status, %new_status, "Updated monitor status.");

    if old_status == new_status {
        return Ok(StatusChange::Unchanged(new_status));
    }

    let report = notifier.notify(monitor_id, new_status, old_status).await;
    if report.failed() > 0 {
        warn!(
            %monitor_id,
            failed = report.failed(),
            delivered = report.delivered(),
            "Some notification channels failed."
        );
    }
    Ok(StatusChange::Changed {
        from: old_status,
        to: new_status,
    })
}
