//! Redis work queue implementation using LIST operations.
//!
//! Items are pushed as JSON onto `{queue}:pending`; downstream consumers pop
//! them from the other end.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use intake_core::domain::WorkItem;
use intake_core::ports::{QueueError, WorkQueue};

use crate::store::RedisConfig;

/// Redis-backed work queue (producer side).
pub struct RedisWorkQueue {
    conn: ConnectionManager,
}

impl RedisWorkQueue {
    pub async fn new(config: &RedisConfig) -> Result<Self, QueueError> {
        let conn = config.connect().await.map_err(QueueError::Backend)?;

        tracing::info!(url = %config.url, "Connected to Redis work queue");

        Ok(Self { conn })
    }

    /// Create from environment configuration.
    pub async fn from_env() -> Result<Self, QueueError> {
        Self::new(&RedisConfig::from_env()).await
    }

    fn pending_key(queue: &str) -> String {
        format!("{}:pending", queue)
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, queue: &str, item: &WorkItem) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(item).map_err(|e| QueueError::Enqueue(e.to_string()))?;

        conn.rpush::<_, _, ()>(Self::pending_key(queue), &json)
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))?;

        tracing::debug!(queue = %queue, request_id = %item.request_id, "Work item enqueued");

        Ok(())
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        let mut conn = self.conn.clone();
        conn.llen::<_, usize>(Self::pending_key(queue))
            .await
            .map_err(|e| QueueError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    async fn get_test_queue() -> Option<(RedisWorkQueue, ConnectionManager)> {
        let config = RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6389".to_string()),
            connect_timeout: Duration::from_secs(1),
            fallback_to_memory: false,
        };

        let queue = RedisWorkQueue::new(&config).await.ok()?;
        let conn = config.connect().await.ok()?;
        Some((queue, conn))
    }

    #[tokio::test]
    async fn test_redis_enqueue_pushes_json() {
        let (queue, mut conn) = match get_test_queue().await {
            Some(q) => q,
            None => return,
        };
        let name = format!(
            "test_intake_queue_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        );
        let item = WorkItem {
            request_id: "r1".to_string(),
            user_id: "u1".to_string(),
            received_at: Utc::now(),
        };

        queue.enqueue(&name, &item).await.unwrap();
        assert_eq!(queue.depth(&name).await.unwrap(), 1);

        let raw: Option<String> = conn.lpop(format!("{}:pending", name), None).await.unwrap();
        let popped: WorkItem = serde_json::from_str(&raw.unwrap()).unwrap();
        assert_eq!(popped, item);
        assert_eq!(queue.depth(&name).await.unwrap(), 0);
    }
}
