//! At-least-once job queue with visibility timeouts.
//!
//! A received message stays hidden from other consumers until its visibility
//! timeout expires. Acknowledging deletes it; anything left unacknowledged is
//! delivered again with a fresh handle, and the previous handle stops working.

pub mod job;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use job::{JobDecodeError, JobPayload};
pub use memory::InMemoryQueue;
pub use postgres::PgJobQueue;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Invalid or expired ack handle: {0}")]
    InvalidHandle(String),
}

/// A delivered message together with the handle needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub body: String,
    pub ack_handle: String,
    /// How many times this message has been handed out, this delivery included.
    pub receive_count: u32,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a message and returns its id.
    async fn enqueue(&self, body: String) -> Result<String, QueueError>;

    /// Waits up to `wait` for at least one visible message and returns at most
    /// `max_messages`. An empty batch means the wait elapsed.
    async fn receive_batch(
        &self,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Deletes a delivered message. Each handle can be used once.
    async fn ack(&self, ack_handle: &str) -> Result<(), QueueError>;
}
