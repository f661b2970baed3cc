//! Policy registry - per-user quota configuration held in the counter store.

use std::sync::Arc;

use crate::domain::QuotaPolicy;
use crate::error::PolicyError;
use crate::ports::{CounterStore, StoreError};

use super::keys::KeySpace;

pub struct PolicyRegistry {
    store: Arc<dyn CounterStore>,
    keys: KeySpace,
}

impl PolicyRegistry {
    pub fn new(store: Arc<dyn CounterStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// Validate and persist a policy, replacing any previous one for the user.
    /// Policies never expire and writing one leaves usage windows untouched.
    pub async fn set_policy(
        &self,
        user_id: &str,
        minute_limit: i64,
        month_limit: i64,
    ) -> Result<QuotaPolicy, PolicyError> {
        let policy = QuotaPolicy::new(user_id, minute_limit, month_limit)?;
        let value = serde_json::to_string(&policy)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.store
            .set(&self.keys.policy(&policy.user_id), &value, None)
            .await?;

        tracing::info!(
            user_id = %policy.user_id,
            minute_limit = policy.minute_limit,
            month_limit = policy.month_limit,
            "Quota policy stored"
        );

        Ok(policy)
    }

    pub async fn get_policy(&self, user_id: &str) -> Result<QuotaPolicy, PolicyError> {
        let raw = self
            .store
            .get(&self.keys.policy(user_id))
            .await?
            .ok_or_else(|| PolicyError::NotFound(user_id.to_string()))?;

        let policy: QuotaPolicy =
            serde_json::from_str(&raw).map_err(|e| PolicyError::Corrupt {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;

        if policy.minute_limit <= 0 || policy.month_limit <= 0 || policy.user_id != user_id {
            return Err(PolicyError::Corrupt {
                user_id: user_id.to_string(),
                reason: "stored limits or owner do not match".to_string(),
            });
        }

        Ok(policy)
    }
}
