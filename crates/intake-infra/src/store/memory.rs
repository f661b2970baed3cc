//! In-memory counter store - used when Redis is not configured.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use intake_core::ports::{CounterStore, StoreError};

struct StoreEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// In-memory counter store using a HashMap behind an async RwLock.
///
/// Each mutating operation runs under one write lock, which makes it atomic
/// with respect to every other caller in this process.
/// Note: State is per-process and lost on restart; multiple server
/// instances each see their own counters.
pub struct InMemoryCounterStore {
    store: RwLock<HashMap<String, StoreEntry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut store = self.store.write().await;
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired(now));
        before - store.len()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let store = self.store.read().await;
        store.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, ttl_on_create: Duration) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut store = self.store.write().await;

        if let Some(entry) = store.get_mut(key).filter(|e| !e.is_expired(now)) {
            let current: i64 = entry.value.parse().map_err(|_| {
                StoreError::Operation(format!("value at '{}' is not an integer", key))
            })?;
            let next = current + 1;
            entry.value = next.to_string();
            return Ok(next);
        }

        store.insert(
            key.to_string(),
            StoreEntry {
                value: "1".to_string(),
                expires_at: Some(now + ttl_on_create),
            },
        );
        Ok(1)
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut store = self.store.write().await;

        if store.get(key).is_some_and(|e| !e.is_expired(now)) {
            return Ok(false);
        }

        store.insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let store = self.store.read().await;

        let found = store
            .get(key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));
        drop(store);

        match found {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                // Clean up expired entry with write lock
                let mut store = self.store.write().await;
                if store.get(key).is_some_and(|e| e.is_expired(now)) {
                    store.remove(key);
                }
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut store = self.store.write().await;

        store.insert(
            key.to_string(),
            StoreEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut store = self.store.write().await;
        store.remove(key);
        Ok(())
    }
}
