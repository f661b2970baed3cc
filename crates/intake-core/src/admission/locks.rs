//! Cooldown locks - per-user admission blocks until a window resets.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{CooldownLock, LockReason, ttl_until};
use crate::ports::{CounterStore, StoreError};

use super::keys::KeySpace;

pub struct CooldownLocks {
    store: Arc<dyn CounterStore>,
    keys: KeySpace,
}

impl CooldownLocks {
    pub fn new(store: Arc<dyn CounterStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// The user's active lock, if any. A lock past its deadline is ignored
    /// even if the store still holds it.
    pub async fn is_locked(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<CooldownLock>, StoreError> {
        let Some(raw) = self.store.get(&self.keys.lock(user_id)).await? else {
            return Ok(None);
        };

        let lock: CooldownLock =
            serde_json::from_str(&raw).map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(lock.is_active(now).then_some(lock))
    }

    /// Lock the user until `expires_at`; `now` only sizes the store TTL.
    ///
    /// An active lock that already runs at least as long is kept and
    /// returned. The read and the write are separate round-trips, so two
    /// racing overflows can still leave the shorter lock; both reject.
    pub async fn acquire(
        &self,
        user_id: &str,
        reason: LockReason,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<CooldownLock, StoreError> {
        match self.is_locked(user_id, now).await {
            Ok(Some(existing)) if existing.expires_at >= expires_at => return Ok(existing),
            Ok(_) | Err(StoreError::Serialization(_)) => {}
            Err(e) => return Err(e),
        }

        let lock = CooldownLock {
            user_id: user_id.to_string(),
            reason,
            expires_at,
        };
        let value =
            serde_json::to_string(&lock).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.store
            .set(
                &self.keys.lock(user_id),
                &value,
                Some(ttl_until(expires_at, now)),
            )
            .await?;

        tracing::debug!(
            user_id = %user_id,
            reason = ?reason,
            expires_at = %expires_at,
            "Cooldown lock acquired"
        );

        Ok(lock)
    }
}
