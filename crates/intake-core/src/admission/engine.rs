//! Admission decision engine.
//!
//! Evaluation order per submission: duplicate check, cooldown lock, policy
//! lookup, minute window, month window, queue handoff. Only the two window
//! increments mutate usage, so every cheaper rejection happens before them.
//! Any infrastructure error before the handoff rejects the submission.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{FailureCause, Outcome, ProcessingCalendar, Submission, WindowKind, WorkItem};
use crate::error::PolicyError;
use crate::ports::{CounterStore, StoreError, WorkQueue};

use super::duplicates::{DEFAULT_DUPLICATE_RETENTION, DuplicateCheck, DuplicateSuppressor};
use super::keys::{DEFAULT_KEY_PREFIX, KeySpace};
use super::locks::CooldownLocks;
use super::policies::PolicyRegistry;
use super::usage::UsageCounter;

pub const DEFAULT_QUEUE_NAME: &str = "data-processor";

/// Engine settings.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Prefix for every counter store key.
    pub key_prefix: String,
    /// Work queue that receives admitted submissions.
    pub queue_name: String,
    /// How long a request id is remembered.
    pub duplicate_retention: Duration,
    /// Timezone used for minute and month boundaries.
    pub calendar: ProcessingCalendar,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            duplicate_retention: DEFAULT_DUPLICATE_RETENTION,
            calendar: ProcessingCalendar::utc(),
        }
    }
}

/// Admits or rejects submissions. Holds no per-user state of its own, so
/// any number of engines may share one counter store.
pub struct AdmissionEngine {
    duplicates: DuplicateSuppressor,
    locks: CooldownLocks,
    policies: PolicyRegistry,
    usage: UsageCounter,
    queue: Arc<dyn WorkQueue>,
    queue_name: String,
}

impl AdmissionEngine {
    pub fn new(
        store: Arc<dyn CounterStore>,
        queue: Arc<dyn WorkQueue>,
        config: AdmissionConfig,
    ) -> Self {
        let keys = KeySpace::new(config.key_prefix);

        Self {
            duplicates: DuplicateSuppressor::new(
                store.clone(),
                keys.clone(),
                config.duplicate_retention,
            ),
            locks: CooldownLocks::new(store.clone(), keys.clone()),
            policies: PolicyRegistry::new(store.clone(), keys.clone()),
            usage: UsageCounter::new(store, keys, config.calendar),
            queue,
            queue_name: config.queue_name,
        }
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub fn locks(&self) -> &CooldownLocks {
        &self.locks
    }

    pub fn usage(&self) -> &UsageCounter {
        &self.usage
    }

    pub fn duplicates(&self) -> &DuplicateSuppressor {
        &self.duplicates
    }

    pub fn queue(&self) -> &Arc<dyn WorkQueue> {
        &self.queue
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Decide on a parsed submission received at `now`.
    #[tracing::instrument(
        name = "admission",
        skip(self, submission, now),
        fields(request_id = %submission.id, user_id = %submission.user_id)
    )]
    pub async fn submit(&self, submission: &Submission, now: DateTime<Utc>) -> Outcome {
        if let Err(e) = submission.validate() {
            return Outcome::RejectMalformed(e.to_string());
        }

        match self.duplicates.check_and_mark(&submission.id, now).await {
            Ok(DuplicateCheck::FirstSeen) => {}
            Ok(DuplicateCheck::Duplicate) => {
                tracing::debug!("Duplicate submission");
                return Outcome::RejectDuplicate;
            }
            Err(e) => return store_failure("duplicate check", &e),
        }

        let outcome = self.decide(submission, now).await;

        if !outcome.is_admitted() {
            // The request was not taken into processing; let the client retry it.
            if let Err(e) = self.duplicates.release(&submission.id).await {
                tracing::warn!(error = %e, "Failed to release duplicate record");
            }
        }

        tracing::debug!(outcome = outcome.label(), "Admission decided");
        outcome
    }

    async fn decide(&self, submission: &Submission, now: DateTime<Utc>) -> Outcome {
        let user_id = submission.user_id.as_str();

        match self.locks.is_locked(user_id, now).await {
            Ok(Some(lock)) => {
                tracing::debug!(
                    reason = ?lock.reason,
                    expires_at = %lock.expires_at,
                    "User in cooldown"
                );
                return Outcome::RejectLocked(lock);
            }
            Ok(None) => {}
            Err(e) => return store_failure("lock check", &e),
        }

        let policy = match self.policies.get_policy(user_id).await {
            Ok(policy) => policy,
            Err(PolicyError::NotFound(_)) => {
                tracing::debug!("No quota policy for user");
                return Outcome::RejectUnknownUser;
            }
            Err(PolicyError::Store(e)) => return store_failure("policy lookup", &e),
            Err(e) => {
                tracing::error!(error = %e, "Quota policy unusable, rejecting");
                return Outcome::Fail(FailureCause::StoreUnavailable);
            }
        };

        if let Some(rejection) = self
            .charge(user_id, WindowKind::Minute, policy.minute_limit, now)
            .await
        {
            return rejection;
        }

        if let Some(rejection) = self
            .charge(user_id, WindowKind::Month, policy.month_limit, now)
            .await
        {
            return rejection;
        }

        let item = WorkItem::from_submission(submission, now);
        match self.queue.enqueue(&self.queue_name, &item).await {
            Ok(()) => {
                tracing::info!(queue = %self.queue_name, "Submission admitted");
                Outcome::Admit
            }
            Err(e) => {
                tracing::error!(
                    queue = %self.queue_name,
                    error = %e,
                    "Work queue handoff failed after usage was charged"
                );
                Outcome::Fail(FailureCause::QueueUnavailable)
            }
        }
    }

    /// Increment one window. Returns the terminal outcome when the window is
    /// exhausted or the store fails, `None` when the request fits.
    async fn charge(
        &self,
        user_id: &str,
        kind: WindowKind,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Option<Outcome> {
        let window = match self.usage.increment(user_id, kind, now).await {
            Ok(window) => window,
            Err(e) => return Some(store_failure("usage increment", &e)),
        };

        if window.count <= limit {
            return None;
        }

        tracing::info!(
            window = %kind,
            count = window.count,
            limit,
            reset_at = %window.end,
            "Quota exceeded"
        );

        if let Err(e) = self.locks.acquire(user_id, kind.into(), window.end, now).await {
            tracing::warn!(window = %kind, error = %e, "Failed to record cooldown lock");
        }

        Some(match kind {
            WindowKind::Minute => Outcome::RejectMinuteQuota {
                retry_at: window.end,
            },
            WindowKind::Month => Outcome::RejectMonthQuota {
                retry_at: window.end,
            },
        })
    }
}

fn store_failure(step: &str, error: &StoreError) -> Outcome {
    tracing::error!(step, error = %error, "Counter store unavailable, rejecting");
    Outcome::Fail(FailureCause::StoreUnavailable)
}
