//! Duplicate suppressor - one conditional create per request id.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::DuplicateRecord;
use crate::ports::{CounterStore, StoreError};

use super::keys::KeySpace;

/// Default retention horizon for seen request ids.
pub const DEFAULT_DUPLICATE_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateCheck {
    FirstSeen,
    Duplicate,
}

pub struct DuplicateSuppressor {
    store: Arc<dyn CounterStore>,
    keys: KeySpace,
    retention: Duration,
}

impl DuplicateSuppressor {
    pub fn new(store: Arc<dyn CounterStore>, keys: KeySpace, retention: Duration) -> Self {
        Self {
            store,
            keys,
            retention,
        }
    }

    /// Record `request_id` unless it is already recorded. A duplicate leaves
    /// the existing record untouched.
    pub async fn check_and_mark(
        &self,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> Result<DuplicateCheck, StoreError> {
        let record = DuplicateRecord {
            request_id: request_id.to_string(),
            first_seen_at: now,
            retention_deadline: chrono::Duration::from_std(self.retention)
                .ok()
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let value =
            serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let created = self
            .store
            .create_if_absent(&self.keys.duplicate(request_id), &value, self.retention)
            .await?;

        Ok(if created {
            DuplicateCheck::FirstSeen
        } else {
            DuplicateCheck::Duplicate
        })
    }

    /// Forget a request id so the same submission can be made again.
    pub async fn release(&self, request_id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.keys.duplicate(request_id)).await
    }

    pub async fn record(&self, request_id: &str) -> Result<Option<DuplicateRecord>, StoreError> {
        match self.store.get(&self.keys.duplicate(request_id)).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }
}
