use sqlx::{PgPool, Result};
use uuid::Uuid;

use crate::db::models::{CheckResult, NewCheckResult};

/// Appends a check result. `checked_at` is set by the database clock.
pub async fn insert_check_result(pool: &PgPool, record: &NewCheckResult) -> Result<CheckResult> {
    sqlx::query_as::<_, CheckResult>(
        r#"
        INSERT INTO check_results (monitor_id, status_code, response_time_ms, was_successful, error_message, checked_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING id, monitor_id, status_code, response_time_ms, was_successful, error_message, checked_at
        "#,
    )
    .bind(record.monitor_id)
    .bind(record.status_code)
    .bind(record.response_time_ms)
    .bind(record.was_successful)
    .bind(&record.error_message)
    .fetch_one(pool)
    .await
}

/// The most recent result for a monitor, if it has ever been checked.
pub async fn get_latest_check_result(pool: &PgPool, monitor_id: Uuid) -> Result<Option<CheckResult>> {
    sqlx::query_as::<_, CheckResult>(
        r#"
        SELECT id, monitor_id, status_code, response_time_ms, was_successful, error_message, checked_at
        FROM check_results
        WHERE monitor_id = $1
        ORDER BY checked_at DESC
        LIMIT 1
        "#,
    )
    .bind(monitor_id)
    .fetch_optional(pool)
    .await
}
