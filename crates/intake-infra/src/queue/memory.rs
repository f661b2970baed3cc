//! In-memory work queue implementation.
//!
//! This is a fallback when Redis is not available.
//! Items are buffered in a bounded channel and drained by local workers.
//! Note: Items are lost on server restart.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use intake_core::domain::WorkItem;
use intake_core::ports::{QueueError, WorkQueue};

/// In-memory work queue configuration.
#[derive(Debug, Clone)]
pub struct InMemoryWorkQueueConfig {
    /// Maximum number of items waiting across all queues.
    pub max_size: usize,
    /// Number of worker tasks.
    pub workers: usize,
}

impl Default for InMemoryWorkQueueConfig {
    fn default() -> Self {
        Self {
            max_size: 10000,
            workers: 4,
        }
    }
}

impl InMemoryWorkQueueConfig {
    pub fn from_env() -> Self {
        Self {
            max_size: std::env::var("JOB_QUEUE_MAX_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10000),
            workers: std::env::var("JOB_QUEUE_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4),
        }
    }
}

/// An item together with the queue it was handed to.
#[derive(Debug, Clone)]
pub struct QueuedWork {
    pub queue: String,
    pub item: WorkItem,
}

/// Result of handling one item in a local worker.
#[derive(Debug, Clone)]
pub enum WorkResult {
    Done,
    Failed(String),
}

/// Snapshot of the worker counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Default)]
struct WorkStats {
    pending: AtomicUsize,
    processing: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// In-memory work queue.
pub struct InMemoryWorkQueue {
    stats: Arc<WorkStats>,
    depths: Arc<Mutex<HashMap<String, usize>>>,
    config: InMemoryWorkQueueConfig,
    sender: mpsc::Sender<QueuedWork>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedWork>>>,
}

impl InMemoryWorkQueue {
    pub fn new(config: InMemoryWorkQueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.max_size.max(1));

        Self {
            stats: Arc::new(WorkStats::default()),
            depths: Arc::new(Mutex::new(HashMap::new())),
            config,
            sender: tx,
            receiver: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn from_env() -> Self {
        Self::new(InMemoryWorkQueueConfig::from_env())
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.stats.pending.load(Ordering::Relaxed),
            processing: self.stats.processing.load(Ordering::Relaxed),
            completed: self.stats.completed.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// Spawn `config.workers` tasks that drain the queue through `handler`.
    ///
    /// Failed items are counted and logged; they are not retried.
    pub fn start_workers<F>(&self, handler: F)
    where
        F: Fn(QueuedWork) -> Pin<Box<dyn Future<Output = WorkResult> + Send>>
            + Send
            + Sync
            + 'static,
    {
        let handler = Arc::new(handler);

        for worker_id in 0..self.config.workers {
            let handler = handler.clone();
            let receiver = self.receiver.clone();
            let stats = self.stats.clone();
            let depths = self.depths.clone();

            tokio::spawn(async move {
                tracing::info!("Work queue worker {} started", worker_id);

                loop {
                    let work = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };

                    let Some(work) = work else {
                        tracing::info!("Work queue worker {} shutting down", worker_id);
                        break;
                    };

                    stats.pending.fetch_sub(1, Ordering::Relaxed);
                    if let Some(depth) = depths.lock().await.get_mut(&work.queue) {
                        *depth = depth.saturating_sub(1);
                    }
                    stats.processing.fetch_add(1, Ordering::Relaxed);

                    let request_id = work.item.request_id.clone();
                    tracing::debug!(
                        worker = worker_id,
                        queue = %work.queue,
                        request_id = %request_id,
                        "Processing work item"
                    );

                    let result = handler(work).await;
                    stats.processing.fetch_sub(1, Ordering::Relaxed);

                    match result {
                        WorkResult::Done => {
                            stats.completed.fetch_add(1, Ordering::Relaxed);
                        }
                        WorkResult::Failed(reason) => {
                            stats.failed.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(
                                request_id = %request_id,
                                reason = %reason,
                                "Work item failed"
                            );
                        }
                    }
                }
            });
        }
    }
}

impl Default for InMemoryWorkQueue {
    fn default() -> Self {
        Self::new(InMemoryWorkQueueConfig::default())
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn enqueue(&self, queue: &str, item: &WorkItem) -> Result<(), QueueError> {
        let work = QueuedWork {
            queue: queue.to_string(),
            item: item.clone(),
        };

        // Count before sending so a fast worker never decrements first.
        self.stats.pending.fetch_add(1, Ordering::Relaxed);
        *self.depths.lock().await.entry(queue.to_string()).or_insert(0) += 1;

        if let Err(e) = self.sender.try_send(work) {
            self.stats.pending.fetch_sub(1, Ordering::Relaxed);
            if let Some(depth) = self.depths.lock().await.get_mut(queue) {
                *depth = depth.saturating_sub(1);
            }
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => {
                    QueueError::Enqueue("queue channel closed".to_string())
                }
            });
        }

        tracing::debug!(
            queue = %queue,
            request_id = %item.request_id,
            "Work item enqueued. Pending: {}",
            self.stats.pending.load(Ordering::Relaxed)
        );

        Ok(())
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self.depths.lock().await.get(queue).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn item(id: &str) -> WorkItem {
        WorkItem {
            request_id: id.to_string(),
            user_id: "u1".to_string(),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_enqueue_tracks_depth_per_queue() {
        let queue = InMemoryWorkQueue::default();

        queue.enqueue("a", &item("r1")).await.unwrap();
        queue.enqueue("a", &item("r2")).await.unwrap();
        queue.enqueue("b", &item("r3")).await.unwrap();

        assert_eq!(queue.depth("a").await.unwrap(), 2);
        assert_eq!(queue.depth("b").await.unwrap(), 1);
        assert_eq!(queue.depth("c").await.unwrap(), 0);
        assert_eq!(queue.stats().pending, 3);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_when_full() {
        let queue = InMemoryWorkQueue::new(InMemoryWorkQueueConfig {
            max_size: 2,
            workers: 1,
        });

        queue.enqueue("a", &item("r1")).await.unwrap();
        queue.enqueue("a", &item("r2")).await.unwrap();

        assert!(matches!(
            queue.enqueue("a", &item("r3")).await,
            Err(QueueError::Full)
        ));
        assert_eq!(queue.depth("a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_workers_drain_queue() {
        let queue = InMemoryWorkQueue::new(InMemoryWorkQueueConfig {
            max_size: 10,
            workers: 2,
        });
        let (tx, mut rx) = mpsc::channel(4);

        queue.start_workers(move |work| {
            let tx = tx.clone();
            Box::pin(async move {
                if work.item.request_id == "bad" {
                    return WorkResult::Failed("rejected downstream".to_string());
                }
                let _ = tx.send(work.item.request_id).await;
                WorkResult::Done
            })
        });

        queue.enqueue("a", &item("r1")).await.unwrap();
        queue.enqueue("a", &item("bad")).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received.as_deref(), Some("r1"));

        // Give the failing item time to be counted.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stats = queue.stats();
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 0);
        assert_eq!(queue.depth("a").await.unwrap(), 0);
    }
}
