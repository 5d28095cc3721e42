//! Due-monitor scheduler.
//!
//! Each pass loads every non-paused monitor, picks the ones whose interval has
//! elapsed and hands one job per monitor to the queue. `last_checked_at` is
//! advanced when the job is queued, not when it completes, so a slow or lost
//! job delays the next check by at most one interval. A monitor whose previous
//! job is still in flight when its interval elapses again is queued again.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::db::enums::MonitorStatus;
use crate::db::models::Monitor;
use crate::db::{MonitorRepository, RepositoryError};
use crate::queue::{JobPayload, JobQueue, QueueError};

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Failed to load monitors: {0}")]
    LoadFailed(#[from] RepositoryError),
}

#[derive(Error, Debug)]
enum DispatchError {
    #[error("Failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Failed to enqueue job: {0}")]
    Queue(#[from] QueueError),
    #[error("Job queued but last check time not saved: {0}")]
    Store(#[from] RepositoryError),
}

/// Counts reported by one scheduling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulePassReport {
    pub due: usize,
    pub queued: usize,
    pub failed: usize,
}

/// A monitor is due when it was never checked, or when at least a full
/// interval has passed since it was last queued. Paused monitors never are.
pub fn is_due(monitor: &Monitor, now: DateTime<Utc>) -> bool {
    if monitor.status == MonitorStatus::Paused {
        return false;
    }
    match monitor.last_checked_at {
        None => true,
        Some(last) => now - last >= chrono::Duration::seconds(i64::from(monitor.interval_seconds)),
    }
}

pub struct Scheduler {
    repository: Arc<dyn MonitorRepository>,
    queue: Arc<dyn JobQueue>,
}

impl Scheduler {
    pub fn new(repository: Arc<dyn MonitorRepository>, queue: Arc<dyn JobQueue>) -> Self {
        Self { repository, queue }
    }

    pub async fn run_pass(&self) -> Result<SchedulePassReport, SchedulerError> {
        self.run_pass_at(Utc::now()).await
    }

    /// Runs one pass as of `now`. Only a failure to load the monitor list
    /// fails the pass; per-monitor failures are logged and counted.
    pub async fn run_pass_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SchedulePassReport, SchedulerError> {
        let monitors = self.repository.find_due_candidates().await?;
        let due: Vec<Monitor> = monitors.into_iter().filter(|m| is_due(m, now)).collect();
        info!(due = due.len(), "Found monitors due for checking.");

        let outcomes = join_all(due.iter().map(|monitor| self.dispatch(monitor, now))).await;

        let mut report = SchedulePassReport {
            due: due.len(),
            ..Default::default()
        };
        for (monitor, outcome) in due.iter().zip(outcomes) {
            match outcome {
                Ok(message_id) => {
                    debug!(monitor_id = %monitor.id, %message_id, "Queued monitor.");
                    report.queued += 1;
                }
                Err(e) => {
                    error!(monitor_id = %monitor.id, error = %e, "Failed to queue monitor.");
                    report.failed += 1;
                }
            }
        }

        info!(
            queued = report.queued,
            failed = report.failed,
            "Scheduling pass finished."
        );
        Ok(report)
    }

    /// Enqueues the job, then advances `last_checked_at`. The timestamp is left
    /// untouched when the enqueue fails so the next pass picks the monitor up.
    async fn dispatch(&self, monitor: &Monitor, now: DateTime<Utc>) -> Result<String, DispatchError> {
        let body = JobPayload::for_monitor(monitor, now).encode()?;
        let message_id = self.queue.enqueue(body).await?;
        if !self.repository.update_last_checked(monitor.id, now).await? {
            warn!(monitor_id = %monitor.id, "Monitor deleted after it was queued.");
        }
        Ok(message_id)
    }

    /// Runs a pass every `period` until the task is dropped. Used when no
    /// external trigger drives the scheduler.
    pub async fn run_periodic(self: Arc<Self>, period: Duration) {
        info!(
            period_seconds = period.as_secs(),
            "Scheduler ticker started."
        );
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_pass().await {
                error!(error = %e, "Scheduling pass failed.");
            }
        }
    }
}
