use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::{JobQueue, QueueError, ReceivedMessage};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, FromRow)]
struct ClaimedRow {
    id: Uuid,
    body: String,
    receipt_handle: Uuid,
    receive_count: i32,
}

/// Queue stored in the `job_queue` table.
///
/// Receiving claims rows with `FOR UPDATE SKIP LOCKED`, so concurrent workers
/// never get the same delivery, and moves `visible_at` forward by the
/// visibility timeout. Each delivery stamps a new receipt handle.
#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PgJobQueue {
    pub fn new(pool: PgPool, visibility_timeout: Duration) -> Self {
        Self {
            pool,
            visibility_timeout,
        }
    }

    async fn claim(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, QueueError> {
        let rows = sqlx::query_as::<_, ClaimedRow>(
            r#"
            UPDATE job_queue
            SET receipt_handle = gen_random_uuid(),
                visible_at = NOW() + make_interval(secs => $2),
                receive_count = receive_count + 1
            WHERE id IN (
                SELECT id FROM job_queue
                WHERE visible_at <= NOW()
                ORDER BY enqueued_at
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, body, receipt_handle, receive_count
            "#,
        )
        .bind(i64::try_from(max_messages).unwrap_or(i64::MAX))
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReceivedMessage {
                message_id: row.id.to_string(),
                body: row.body,
                ack_handle: row.receipt_handle.to_string(),
                receive_count: u32::try_from(row.receive_count).unwrap_or(0),
            })
            .collect())
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, body: String) -> Result<String, QueueError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO job_queue (id, body, visible_at, enqueued_at) VALUES ($1, $2, NOW(), NOW())")
            .bind(id)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(id.to_string())
    }

    async fn receive_batch(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        if max_messages == 0 {
            return Ok(Vec::new());
        }
        let deadline = Instant::now() + wait;
        loop {
            let batch = self.claim(max_messages).await?;
            if !batch.is_empty() {
                debug!(count = batch.len(), "Claimed jobs from queue.");
                return Ok(batch);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(batch);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn ack(&self, ack_handle: &str) -> Result<(), QueueError> {
        let receipt = Uuid::parse_str(ack_handle)
            .map_err(|_| QueueError::InvalidHandle(ack_handle.to_string()))?;
        let result = sqlx::query("DELETE FROM job_queue WHERE receipt_handle = $1")
            .bind(receipt)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(QueueError::InvalidHandle(ack_handle.to_string()));
        }
        Ok(())
    }
}
