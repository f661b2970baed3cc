//! Test doubles for the store and queue ports.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::domain::WorkItem;
use crate::ports::{CounterStore, QueueError, StoreError, WorkQueue};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        self.expires_at.map(|exp| Instant::now() < exp).unwrap_or(true)
    }
}

/// HashMap-backed store. Every operation runs under one mutex.
#[derive(Default)]
pub struct MapStore {
    entries: Mutex<HashMap<String, Entry>>,
    /// Key fragments whose operations fail with a connection error.
    failing: Mutex<Vec<String>>,
    /// Key fragments whose writes fail; reads still succeed.
    failing_writes: Mutex<Vec<String>>,
    /// Yield to the scheduler before every operation.
    yielding: AtomicBool,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on keys containing `fragment` fail.
    pub fn fail_keys_containing(&self, fragment: &str) {
        self.failing.lock().unwrap().push(fragment.to_string());
    }

    /// Make writes (`increment`, `create_if_absent`, `set`, `delete`) on keys
    /// containing `fragment` fail.
    pub fn fail_writes_containing(&self, fragment: &str) {
        self.failing_writes.lock().unwrap().push(fragment.to_string());
    }

    /// Suspend every operation once, so concurrent callers interleave.
    pub fn yielding() -> Self {
        let store = Self::default();
        store.yielding.store(true, Ordering::SeqCst);
        store
    }

    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.live())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).filter(|e| e.live()).map(|e| e.value.clone())
    }

    async fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let failing = self.failing.lock().unwrap();
        if failing.iter().any(|f| key.contains(f.as_str())) {
            return Err(StoreError::Connection(format!("injected failure for {}", key)));
        }
        Ok(())
    }

    async fn check_write(&self, key: &str) -> Result<(), StoreError> {
        self.check(key).await?;
        let failing = self.failing_writes.lock().unwrap();
        if failing.iter().any(|f| key.contains(f.as_str())) {
            return Err(StoreError::Connection(format!("injected write failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl CounterStore for MapStore {
    async fn increment(&self, key: &str, ttl_on_create: Duration) -> Result<i64, StoreError> {
        self.check_write(key).await?;
        let mut entries = self.entries.lock().unwrap();

        let current = match entries.get(key).filter(|e| e.live()) {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|e| StoreError::Operation(e.to_string()))?,
            None => 0,
        };

        let next = current + 1;
        let expires_at = if current == 0 {
            Some(Instant::now() + ttl_on_create)
        } else {
            entries.get(key).and_then(|e| e.expires_at)
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn create_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.check_write(key).await?;
        let mut entries = self.entries.lock().unwrap();
        if entries.get(key).is_some_and(|e| e.live()) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check(key).await?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.check_write(key).await?;
        self.entries.lock().unwrap().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_write(key).await?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Queue that records every handoff.
#[derive(Default)]
pub struct RecordingQueue {
    items: Mutex<Vec<(String, WorkItem)>>,
    unavailable: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn items(&self) -> Vec<(String, WorkItem)> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    async fn enqueue(&self, queue: &str, item: &WorkItem) -> Result<(), QueueError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(QueueError::Backend("queue offline".to_string()));
        }
        self.items
            .lock()
            .unwrap()
            .push((queue.to_string(), item.clone()));
        Ok(())
    }

    async fn depth(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| q == queue)
            .count())
    }
}
