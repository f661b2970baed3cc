//! Work queue implementations.

mod memory;

pub use memory::{InMemoryWorkQueue, InMemoryWorkQueueConfig, QueueStats, QueuedWork, WorkResult};

#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "redis")]
pub use self::redis::RedisWorkQueue;
