//! # Intake Infrastructure
//!
//! Concrete implementations of the ports defined in `intake-core`.
//! This crate contains the counter store and work queue backends.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `redis` - Redis support for the counter store and work queue

pub mod queue;
pub mod store;

// Re-exports - In-Memory
pub use queue::{InMemoryWorkQueue, InMemoryWorkQueueConfig};
pub use store::InMemoryCounterStore;

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use queue::RedisWorkQueue;
#[cfg(feature = "redis")]
pub use store::{RedisConfig, RedisCounterStore};
