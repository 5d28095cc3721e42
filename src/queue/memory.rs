use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use super::{JobQueue, QueueError, ReceivedMessage};

struct Entry {
    id: String,
    body: String,
    receipt: Option<String>,
    visible_at: Instant,
    receive_count: u32,
}

/// Process-local queue with the same delivery contract as [`super::PgJobQueue`].
///
/// Used when the scheduler and the worker run inside one process.
pub struct InMemoryQueue {
    entries: Mutex<Vec<Entry>>,
    visibility_timeout: Duration,
    arrivals: Notify,
}

impl InMemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            visibility_timeout,
            arrivals: Notify::new(),
        }
    }

    /// Messages still in the queue, delivered or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Entry>> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claims up to `max` visible entries. Also returns the earliest time any
    /// entry becomes visible, for callers that got nothing and need to wait.
    fn claim(&self, max: usize) -> (Vec<ReceivedMessage>, Option<Instant>) {
        let now = Instant::now();
        let mut entries = self.lock();
        let mut claimed = Vec::new();
        for entry in entries.iter_mut() {
            if claimed.len() >= max {
                break;
            }
            if entry.visible_at > now {
                continue;
            }
            let receipt = Uuid::new_v4().to_string();
            entry.receipt = Some(receipt.clone());
            entry.visible_at = now + self.visibility_timeout;
            entry.receive_count += 1;
            claimed.push(ReceivedMessage {
                message_id: entry.id.clone(),
                body: entry.body.clone(),
                ack_handle: receipt,
                receive_count: entry.receive_count,
            });
        }
        let next_visible = entries.iter().map(|e| e.visible_at).min();
        (claimed, next_visible)
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn enqueue(&self, body: String) -> Result<String, QueueError> {
        let id = Uuid::new_v4().to_string();
        self.lock().push(Entry {
            id: id.clone(),
            body,
            receipt: None,
            visible_at: Instant::now(),
            receive_count: 0,
        });
        self.arrivals.notify_waiters();
        Ok(id)
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
            // Registered before claiming so an enqueue in between still wakes us.
            let arrival = self.arrivals.notified();
            let (batch, next_visible) = self.claim(max_messages);
            if !batch.is_empty() {
                return Ok(batch);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            let wake_at = next_visible
                .filter(|at| *at > now)
                .map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                _ = arrival => {}
                _ = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn ack(&self, ack_handle: &str) -> Result<(), QueueError> {
        let mut entries = self.lock();
        let position = entries
            .iter()
            .position(|e| e.receipt.as_deref() == Some(ack_handle))
            .ok_or_else(|| QueueError::InvalidHandle(ack_handle.to_string()))?;
        entries.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_received_message_is_hidden_until_timeout() {
        let queue = InMemoryQueue::new(Duration::from_millis(100));
        queue.enqueue("job-1".to_string()).await.unwrap();

        let first = queue.receive_batch(10, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].receive_count, 1);

        let hidden = queue.receive_batch(10, Duration::ZERO).await.unwrap();
        assert!(hidden.is_empty());

        let redelivered = queue
            .receive_batch(10, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].message_id, first[0].message_id);
        assert_eq!(redelivered[0].receive_count, 2);
        assert_ne!(redelivered[0].ack_handle, first[0].ack_handle);
    }

    #[tokio::test]
    async fn test_ack_handle_is_single_use() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        queue.enqueue("job-1".to_string()).await.unwrap();
        let batch = queue.receive_batch(1, Duration::ZERO).await.unwrap();

        queue.ack(&batch[0].ack_handle).await.unwrap();
        assert!(queue.is_empty());
        assert!(matches!(
            queue.ack(&batch[0].ack_handle).await,
            Err(QueueError::InvalidHandle(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_handle_rejected_after_redelivery() {
        let queue = InMemoryQueue::new(Duration::from_millis(20));
        queue.enqueue("job-1".to_string()).await.unwrap();
        let first = queue.receive_batch(1, Duration::ZERO).await.unwrap();
        let second = queue
            .receive_batch(1, Duration::from_millis(500))
            .await
            .unwrap();

        assert!(queue.ack(&first[0].ack_handle).await.is_err());
        queue.ack(&second[0].ack_handle).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_receive_respects_max_messages() {
        let queue = InMemoryQueue::new(Duration::from_secs(30));
        for i in 0..5 {
            queue.enqueue(format!("job-{i}")).await.unwrap();
        }
        let batch = queue.receive_batch(3, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 3);
        let rest = queue.receive_batch(10, Duration::ZERO).await.unwrap();
        assert_eq!(rest.len(), 2);
    }

    #[tokio::test]
    async fn test_long_poll_wakes_on_enqueue() {
        let queue = std::sync::Arc::new(InMemoryQueue::new(Duration::from_secs(30)));
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.enqueue("late".to_string()).await.unwrap();
        });

        let batch = queue.receive_batch(1, Duration::from_secs(5)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, "late");
    }
}
