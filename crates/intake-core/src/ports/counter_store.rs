use async_trait::async_trait;
use std::time::Duration;

/// Counter store trait - shared key-value state for admission decisions
/// (Redis, in-memory).
///
/// Every method is a single round-trip; implementations must make
/// `increment` and `create_if_absent` atomic with respect to concurrent
/// callers on any instance.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the integer at `key` by one and return the new value.
    /// If the call created the key, `ttl_on_create` is applied in the same
    /// atomic step; an existing key keeps its expiry.
    async fn increment(&self, key: &str, ttl_on_create: Duration) -> Result<i64, StoreError>;

    /// Store `value` only if `key` does not exist. Returns `true` if created.
    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Get a value.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value, replacing any previous one. `None` means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Counter store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}
