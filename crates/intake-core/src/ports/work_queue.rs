//! Work queue port - handoff of admitted submissions to downstream processing.

use async_trait::async_trait;

use crate::domain::WorkItem;

/// Work queue trait - abstraction over queue backends.
///
/// `enqueue` returns once the item is accepted by the backend; it never
/// waits for the item to be processed.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Hand an item to the named queue.
    async fn enqueue(&self, queue: &str, item: &WorkItem) -> Result<(), QueueError>;

    /// Number of items waiting in the named queue.
    async fn depth(&self, queue: &str) -> Result<usize, QueueError>;
}

/// Work queue errors.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to enqueue: {0}")]
    Enqueue(String),

    #[error("Queue is full")]
    Full,

    #[error("Backend error: {0}")]
    Backend(String),
}
