//! In-process fakes shared by the unit tests.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::db::enums::{AlertType, MonitorKind, MonitorStatus};
use crate::db::models::{
    AlertIntegration, CheckResult, Monitor, MonitorOwner, NewCheckResult, NotificationTargets,
};
use crate::db::{MonitorRepository, RepositoryError};
use crate::notifications::{NotificationReport, Notifier};
use crate::queue::{InMemoryQueue, JobQueue, QueueError, ReceivedMessage};

pub fn monitor(
    kind: MonitorKind,
    status: MonitorStatus,
    interval_seconds: i32,
    last_checked_at: Option<DateTime<Utc>>,
) -> Monitor {
    Monitor {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "test monitor".to_string(),
        monitor_type: kind,
        target: match kind {
            MonitorKind::Http => "https://example.com/health".to_string(),
            MonitorKind::Cron => "nightly-job".to_string(),
        },
        interval_seconds,
        status,
        last_checked_at,
        created_at: Utc::now(),
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::DatabaseError(sqlx::Error::PoolTimedOut)
}

#[derive(Default)]
pub struct InMemoryRepository {
    monitors: Mutex<HashMap<Uuid, Monitor>>,
    results: Mutex<Vec<CheckResult>>,
    next_result_id: AtomicI64,
    owners: Mutex<HashMap<Uuid, String>>,
    integrations: Mutex<Vec<AlertIntegration>>,
    fail_reads: AtomicBool,
    fail_inserts: AtomicBool,
    fail_status_updates: AtomicBool,
    fail_last_checked: Mutex<HashSet<Uuid>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_monitor(&self, monitor: Monitor) {
        self.monitors.lock().unwrap().insert(monitor.id, monitor);
    }

    pub fn remove_monitor(&self, monitor_id: Uuid) {
        self.monitors.lock().unwrap().remove(&monitor_id);
    }

    pub fn monitor(&self, monitor_id: Uuid) -> Option<Monitor> {
        self.monitors.lock().unwrap().get(&monitor_id).cloned()
    }

    pub fn set_owner(&self, monitor_id: Uuid, email: &str) {
        self.owners
            .lock()
            .unwrap()
            .insert(monitor_id, email.to_string());
    }

    pub fn add_integration(&self, user_id: Uuid, alert_type: AlertType, target: &str, verified: bool) {
        self.integrations.lock().unwrap().push(AlertIntegration {
            id: Uuid::new_v4(),
            user_id,
            alert_type,
            target: target.to_string(),
            is_verified: verified,
            created_at: Utc::now(),
        });
    }

    pub fn seed_result(&self, monitor_id: Uuid, was_successful: bool, checked_at: DateTime<Utc>) {
        let id = self.next_result_id.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().push(CheckResult {
            id,
            monitor_id,
            status_code: None,
            response_time_ms: None,
            was_successful,
            error_message: None,
            checked_at,
        });
    }

    pub fn results_for(&self, monitor_id: Uuid) -> Vec<CheckResult> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .cloned()
            .collect()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status_updates(&self, fail: bool) {
        self.fail_status_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_last_checked_for(&self, monitor_id: Uuid) {
        self.fail_last_checked.lock().unwrap().insert(monitor_id);
    }

    fn check_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl MonitorRepository for InMemoryRepository {
    async fn find_due_candidates(&self) -> Result<Vec<Monitor>, RepositoryError> {
        self.check_reads()?;
        Ok(self
            .monitors
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.status != MonitorStatus::Paused)
            .cloned()
            .collect())
    }

    async fn get_monitor(&self, monitor_id: Uuid) -> Result<Option<Monitor>, RepositoryError> {
        self.check_reads()?;
        Ok(self.monitor(monitor_id))
    }

    async fn update_last_checked(
        &self,
        monitor_id: Uuid,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        if self.fail_last_checked.lock().unwrap().contains(&monitor_id) {
            return Err(unavailable());
        }
        let mut monitors = self.monitors.lock().unwrap();
        Ok(match monitors.get_mut(&monitor_id) {
            Some(m) => {
                m.last_checked_at = Some(checked_at);
                true
            }
            None => false,
        })
    }

    async fn update_status(
        &self,
        monitor_id: Uuid,
        status: MonitorStatus,
    ) -> Result<bool, RepositoryError> {
        if self.fail_status_updates.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let mut monitors = self.monitors.lock().unwrap();
        Ok(match monitors.get_mut(&monitor_id) {
            Some(m) => {
                m.status = status;
                true
            }
            None => false,
        })
    }

    async fn insert_check_result(
        &self,
        record: NewCheckResult,
    ) -> Result<CheckResult, RepositoryError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if self.monitor(record.monitor_id).is_none() {
            return Err(RepositoryError::MonitorNotFound(record.monitor_id));
        }
        let result = CheckResult {
            id: self.next_result_id.fetch_add(1, Ordering::SeqCst),
            monitor_id: record.monitor_id,
            status_code: record.status_code,
            response_time_ms: record.response_time_ms,
            was_successful: record.was_successful,
            error_message: record.error_message,
            checked_at: Utc::now(),
        };
        self.results.lock().unwrap().push(result.clone());
        Ok(result)
    }

    async fn latest_check_result(
        &self,
        monitor_id: Uuid,
    ) -> Result<Option<CheckResult>, RepositoryError> {
        self.check_reads()?;
        Ok(self
            .results
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .max_by_key(|r| r.checked_at)
            .cloned())
    }

    async fn notification_targets(
        &self,
        monitor_id: Uuid,
    ) -> Result<Option<NotificationTargets>, RepositoryError> {
        self.check_reads()?;
        let Some(monitor) = self.monitor(monitor_id) else {
            return Ok(None);
        };
        let email = self
            .owners
            .lock()
            .unwrap()
            .get(&monitor_id)
            .cloned()
            .unwrap_or_else(|| "owner@example.com".to_string());
        let integrations = self
            .integrations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == monitor.user_id && i.is_verified)
            .cloned()
            .collect();
        Ok(Some(NotificationTargets {
            owner: MonitorOwner {
                monitor_name: monitor.name,
                user_id: monitor.user_id,
                email,
            },
            integrations,
        }))
    }
}

/// Records every call instead of delivering anything.
#[derive(Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(Uuid, MonitorStatus, MonitorStatus)>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<(Uuid, MonitorStatus, MonitorStatus)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        monitor_id: Uuid,
        new_status: MonitorStatus,
        old_status: MonitorStatus,
    ) -> NotificationReport {
        self.calls
            .lock()
            .unwrap()
            .push((monitor_id, new_status, old_status));
        NotificationReport::default()
    }
}

/// An [`InMemoryQueue`] that can be told to reject enqueues for given monitors
/// or to reject every ack.
pub struct FlakyQueue {
    pub inner: InMemoryQueue,
    fail_enqueue_for: Mutex<HashSet<Uuid>>,
    fail_acks: AtomicBool,
}

impl FlakyQueue {
    pub fn new() -> Self {
        Self {
            inner: InMemoryQueue::new(Duration::from_secs(30)),
            fail_enqueue_for: Mutex::new(HashSet::new()),
            fail_acks: AtomicBool::new(false),
        }
    }

    pub fn fail_enqueue_for(&self, monitor_id: Uuid) {
        self.fail_enqueue_for.lock().unwrap().insert(monitor_id);
    }

    pub fn fail_acks(&self, fail: bool) {
        self.fail_acks.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobQueue for FlakyQueue {
    async fn enqueue(&self, body: String) -> Result<String, QueueError> {
        let rejected = self
            .fail_enqueue_for
            .lock()
            .unwrap()
            .iter()
            .any(|id| body.contains(&id.to_string()));
        if rejected {
            return Err(QueueError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        self.inner.enqueue(body).await
    }

    async fn receive_batch(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        self.inner.receive_batch(max_messages, wait).await
    }

    async fn ack(&self, ack_handle: &str) -> Result<(), QueueError> {
        if self.fail_acks.load(Ordering::SeqCst) {
            return Err(QueueError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        self.inner.ack(ack_handle).await
    }
}

/// Serves `status` on every path after `delay`. Returns the base URL.
pub async fn spawn_http_stub(status: StatusCode, delay: Duration) -> String {
    let app = Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        (status, "stub")
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

/// Serves `chunks` chunks of `chunk_size` bytes as a streamed 200 response.
pub async fn spawn_streaming_stub(chunks: usize, chunk_size: usize) -> String {
    let app = Router::new().fallback(move || async move {
        let chunk = Bytes::from(vec![b'x'; chunk_size]);
        let stream = futures::stream::iter(
            (0..chunks).map(move |_| Ok::<_, std::io::Error>(chunk.clone())),
        );
        Body::from_stream(stream)
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

/// Accepts connections and never writes a byte back.
pub async fn spawn_silent_listener() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}/")
}
