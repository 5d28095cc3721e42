//! Check worker: turns queued jobs into check results and status changes.

pub mod status;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::enums::MonitorStatus;
use crate::db::{MonitorRepository, RepositoryError};
use crate::notifications::Notifier;
use crate::probe::Prober;
use crate::queue::{JobDecodeError, JobPayload, JobQueue, QueueError, ReceivedMessage};
pub use status::{StatusChange, apply_status};

const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("{0}")]
    Decode(#[from] JobDecodeError),
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub batch_size: usize,
    pub receive_wait: Duration,
    /// Deliveries after which a job is logged as repeatedly failing.
    pub redelivery_warn_threshold: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            receive_wait: Duration::from_secs(20),
            redelivery_warn_threshold: 5,
        }
    }
}

/// A job that went through every step and was acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedJob {
    pub monitor_id: Uuid,
    pub success: bool,
    pub change: StatusChange,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub acknowledged: usize,
    /// Left unacknowledged; the queue will deliver them again.
    pub abandoned: usize,
}

pub struct CheckWorker {
    repository: Arc<dyn MonitorRepository>,
    queue: Arc<dyn JobQueue>,
    prober: Arc<Prober>,
    notifier: Arc<dyn Notifier>,
    settings: WorkerSettings,
}

impl CheckWorker {
    pub fn new(
        repository: Arc<dyn MonitorRepository>,
        queue: Arc<dyn JobQueue>,
        prober: Arc<Prober>,
        notifier: Arc<dyn Notifier>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            repository,
            queue,
            prober,
            notifier,
            settings,
        }
    }

    /// Processes every message of a batch on its own task. A failing or
    /// panicking job only affects itself.
    pub async fn process_batch(self: &Arc<Self>, messages: Vec<ReceivedMessage>) -> BatchReport {
        let mut report = BatchReport {
            received: messages.len(),
            ..Default::default()
        };
        if messages.is_empty() {
            return report;
        }
        info!(count = messages.len(), "Processing job batch.");

        let mut tasks = JoinSet::new();
        for message in messages {
            let worker = Arc::clone(self);
            tasks.spawn(async move {
                let result = worker.process_message(&message).await;
                (message, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(processed))) => {
                    debug!(monitor_id = %processed.monitor_id, success = processed.success, "Job processed.");
                    report.acknowledged += 1;
                }
                Ok((message, Err(e))) => {
                    error!(message_id = %message.message_id, error = %e, "Failed to process job, leaving it for redelivery.");
                    report.abandoned += 1;
                }
                Err(e) => {
                    error!(error = %e, "Job task panicked, leaving it for redelivery.");
                    report.abandoned += 1;
                }
            }
        }

        info!(
            acknowledged = report.acknowledged,
            abandoned = report.abandoned,
            "Finished processing job batch."
        );
        report
    }

    /// Decode, probe, record, apply status, acknowledge. Any error before the
    /// acknowledgement leaves the message in the queue.
    pub async fn process_message(
        &self,
        message: &ReceivedMessage,
    ) -> Result<ProcessedJob, WorkerError> {
        if message.receive_count >= self.settings.redelivery_warn_threshold {
            warn!(
                message_id = %message.message_id,
                receive_count = message.receive_count,
                "Job has been delivered repeatedly without completing."
            );
        }

        let job = JobPayload::decode(&message.body)?;
        debug!(monitor_id = %job.monitor_id, kind = %job.kind, "Processing monitor.");

        let outcome = self.prober.probe(job.kind, &job.target, job.monitor_id).await;
        let change = match self
            .repository
            .insert_check_result(outcome.to_record(job.monitor_id))
            .await
        {
            Ok(_) => {
                let new_status = MonitorStatus::from_probe_success(outcome.success);
                apply_status(
                    self.repository.as_ref(),
                    self.notifier.as_ref(),
                    job.monitor_id,
                    new_status,
                )
                .await?
            }
            Err(RepositoryError::MonitorNotFound(_)) => {
                warn!(monitor_id = %job.monitor_id, "Monitor deleted while its check was in flight.");
                StatusChange::MonitorMissing
            }
            Err(e) => return Err(e.into()),
        };

        self.queue.ack(&message.ack_handle).await?;
        info!(monitor_id = %job.monitor_id, message_id = %message.message_id, "Processed and acknowledged job.");

        Ok(ProcessedJob {
            monitor_id: job.monitor_id,
            success: outcome.success,
            change,
        })
    }

    /// Receives and processes batches until `shutdown` resolves. A batch that
    /// is already being processed is finished first.
    pub async fn run<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            batch_size = self.settings.batch_size,
            wait_seconds = self.settings.receive_wait.as_secs(),
            "Check worker started."
        );
        tokio::pin!(shutdown);
        loop {
            let received = tokio::select! {
                _ = &mut shutdown => break,
                received = self.queue.receive_batch(self.settings.batch_size, self.settings.receive_wait) => received,
            };
            match received {
                Ok(messages) => {
                    self.process_batch(messages).await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to receive jobs from queue.");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(RECEIVE_ERROR_BACKOFF) => {}
                    }
                }
            }
        }
        info!("Check worker stopped.");
    }
}
