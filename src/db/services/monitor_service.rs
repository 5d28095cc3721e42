use chrono::{DateTime, Utc};
use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::enums::MonitorStatus;
use crate::db::models::{Monitor, MonitorOwner};

const MONITOR_COLUMNS: &str = "id, user_id, name, monitor_type, target, interval_seconds, status, last_checked_at, created_at";

/// Retrieves every monitor the scheduler may consider, i.e. all that are not paused.
pub async fn get_schedulable_monitors(pool: &PgPool) -> Result<Vec<Monitor>> {
    sqlx::query_as::<_, Monitor>(&format!(
        "SELECT {MONITOR_COLUMNS} FROM monitors WHERE status <> $1 ORDER BY created_at"
    ))
    .bind(MonitorStatus::Paused)
    .fetch_all(pool)
    .await
}

/// Retrieves a monitor by its ID.
pub async fn get_monitor_by_id(pool: &PgPool, monitor_id: Uuid) -> Result<Option<Monitor>> {
    sqlx::query_as::<_, Monitor>(&format!(
        "SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = $1"
    ))
    .bind(monitor_id)
    .fetch_optional(pool)
    .await
}

/// Stamps the time the monitor was last handed to the queue.
/// Returns the number of rows touched (0 if the monitor was deleted).
pub async fn update_last_checked(
    pool: &PgPool,
    monitor_id: Uuid,
    checked_at: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("UPDATE monitors SET last_checked_at = $1 WHERE id = $2")
        .bind(checked_at)
        .bind(monitor_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Overwrites the monitor's status. Last writer wins.
pub async fn update_monitor_status(
    pool: &PgPool,
    monitor_id: Uuid,
    status: MonitorStatus,
) -> Result<u64> {
    let result = sqlx::query("UPDATE monitors SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(monitor_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Monitor name plus the owner's id and email.
pub async fn get_monitor_owner(pool: &PgPool, monitor_id: Uuid) -> Result<Option<MonitorOwner>> {
    sqlx::query_as::<_, MonitorOwner>(
        r#"
        SELECT m.name AS monitor_name, m.user_id, u.email
        FROM monitors m
        JOIN users u ON m.user_id = u.id
        WHERE m.id = $1
        "#,
    )
    .bind(monitor_id)
    .fetch_optional(pool)
    .await
}
