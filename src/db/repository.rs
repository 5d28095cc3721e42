//! Narrow storage interface used by the scheduler, worker, probe engine and notifier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::enums::MonitorStatus;
use super::models::{CheckResult, Monitor, NewCheckResult, NotificationTargets};
use super::services;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Monitor not found: {0}")]
    MonitorNotFound(Uuid),
}

#[async_trait]
pub trait MonitorRepository: Send + Sync {
    /// All monitors that are not paused. Due-ness is decided by the caller.
    async fn find_due_candidates(&self) -> Result<Vec<Monitor>, RepositoryError>;

    async fn get_monitor(&self, monitor_id: Uuid) -> Result<Option<Monitor>, RepositoryError>;

    /// Returns `false` if the monitor no longer exists.
    async fn update_last_checked(
        &self,
        monitor_id: Uuid,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Returns `false` if the monitor no longer exists.
    async fn update_status(
        &self,
        monitor_id: Uuid,
        status: MonitorStatus,
    ) -> Result<bool, RepositoryError>;

    /// Fails with `MonitorNotFound` if the monitor has been deleted.
    async fn insert_check_result(
        &self,
        record: NewCheckResult,
    ) -> Result<CheckResult, RepositoryError>;

    async fn latest_check_result(
        &self,
        monitor_id: Uuid,
    ) -> Result<Option<CheckResult>, RepositoryError>;

    /// Owner contact and verified integrations, or `None` if the monitor is gone.
    async fn notification_targets(
        &self,
        monitor_id: Uuid,
    ) -> Result<Option<NotificationTargets>, RepositoryError>;
}

/// `MonitorRepository` backed by PostgreSQL through a shared connection pool.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonitorRepository for PgRepository {
    async fn find_due_candidates(&self) -> Result<Vec<Monitor>, RepositoryError> {
        Ok(services::get_schedulable_monitors(&self.pool).await?)
    }

    async fn get_monitor(&self, monitor_id: Uuid) -> Result<Option<Monitor>, RepositoryError> {
        Ok(services::get_monitor_by_id(&self.pool, monitor_id).await?)
    }

    async fn update_last_checked(
        &self,
        monitor_id: Uuid,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let rows = services::update_last_checked(&self.pool, monitor_id, checked_at).await?;
        Ok(rows > 0)
    }

    async fn update_status(
        &self,
        monitor_id: Uuid,
        status: MonitorStatus,
    ) -> Result<bool, RepositoryError> {
        let rows = services::update_monitor_status(&self.pool, monitor_id, status).await?;
        Ok(rows > 0)
    }

    async fn insert_check_result(
        &self,
        record: NewCheckResult,
    ) -> Result<CheckResult, RepositoryError> {
        services::insert_check_result(&self.pool, &record)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    RepositoryError::MonitorNotFound(record.monitor_id)
                }
                other => RepositoryError::DatabaseError(other),
            })
    }

    async fn latest_check_result(
        &self,
        monitor_id: Uuid,
    ) -> Result<Option<CheckResult>, RepositoryError> {
        Ok(services::get_latest_check_result(&self.pool, monitor_id).await?)
    }

    async fn notification_targets(
        &self,
        monitor_id: Uuid,
    ) -> Result<Option<NotificationTargets>, RepositoryError> {
        let Some(owner) = services::get_monitor_owner(&self.pool, monitor_id).await? else {
            return Ok(None);
        };
        let integrations =
            services::get_verified_integrations_for_user(&self.pool, owner.user_id).await?;
        Ok(Some(NotificationTargets {
            owner,
            integrations,
        }))
    }
}
