//! Application state - shared across all handlers.

use std::sync::Arc;

use intake_core::AdmissionConfig;
use intake_core::AdmissionEngine;
use intake_core::ports::{CounterStore, WorkQueue};
use intake_infra::queue::WorkResult;
use intake_infra::{InMemoryCounterStore, InMemoryWorkQueue};

#[cfg(feature = "redis")]
use intake_infra::{RedisConfig, RedisCounterStore, RedisWorkQueue};

use crate::background::{Scheduler, SchedulerConfig};
use crate::config::AppConfig;

/// Every minute, on the minute.
const PURGE_SCHEDULE: &str = "0 * * * * *";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AdmissionEngine>,
    /// Which backend the store and queue run on ("redis" or "memory").
    pub backend: &'static str,
    /// Cron jobs for the in-memory backend; `None` when none are scheduled.
    pub scheduler: Option<Arc<Scheduler>>,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        #[cfg(feature = "redis")]
        {
            if config.redis_url.is_some() {
                let redis = RedisConfig::from_env();
                match Self::connect_redis(&redis).await {
                    Ok((store, queue)) => {
                        tracing::info!("Application state initialized (redis)");
                        return Ok(Self::from_parts(
                            store,
                            queue,
                            config.admission.clone(),
                            "redis",
                        ));
                    }
                    Err(e) if redis.fallback_to_memory => {
                        tracing::error!(
                            "Failed to connect to Redis: {}. Using in-memory fallback.",
                            e
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        #[cfg(not(feature = "redis"))]
        {
            if config.redis_url.is_some() {
                tracing::warn!("REDIS_URL is set but the redis feature is disabled");
            }
        }

        if config.redis_url.is_none() {
            tracing::warn!("REDIS_URL not set. Running with in-memory store and queue.");
        }

        let store = Arc::new(InMemoryCounterStore::new());
        let scheduler = match schedule_purge(store.clone()).await {
            Ok(scheduler) => Some(Arc::new(scheduler)),
            Err(e) => {
                tracing::warn!(error = %e, "Expired-key purge not scheduled");
                None
            }
        };

        let queue = Arc::new(InMemoryWorkQueue::new(config.local_queue.clone()));
        queue.start_workers(|work| {
            Box::pin(async move {
                tracing::info!(
                    queue = %work.queue,
                    request_id = %work.item.request_id,
                    user_id = %work.item.user_id,
                    "Work item handed to local processor"
                );
                WorkResult::Done
            })
        });

        tracing::info!("Application state initialized (memory)");

        Ok(Self {
            scheduler,
            ..Self::from_parts(store, queue, config.admission.clone(), "memory")
        })
    }

    pub fn from_parts(
        store: Arc<dyn CounterStore>,
        queue: Arc<dyn WorkQueue>,
        admission: AdmissionConfig,
        backend: &'static str,
    ) -> Self {
        Self {
            engine: Arc::new(AdmissionEngine::new(store, queue, admission)),
            backend,
            scheduler: None,
        }
    }

    #[cfg(feature = "redis")]
    async fn connect_redis(
        config: &RedisConfig,
    ) -> anyhow::Result<(Arc<dyn CounterStore>, Arc<dyn WorkQueue>)> {
        let store = RedisCounterStore::new(config).await?;
        let queue = RedisWorkQueue::new(config).await?;
        Ok((Arc::new(store), Arc::new(queue)))
    }
}

/// Drop expired keys on a schedule so idle windows do not accumulate.
async fn schedule_purge(
    store: Arc<InMemoryCounterStore>,
) -> Result<Scheduler, tokio_cron_scheduler::JobSchedulerError> {
    let scheduler = Scheduler::new(SchedulerConfig::from_env()).await?;
    scheduler
        .add_cron(PURGE_SCHEDULE, move || {
            let store = store.clone();
            async move {
                let removed = store.purge_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Purged expired in-memory keys");
                }
            }
        })
        .await?;
    scheduler.start().await?;
    Ok(scheduler)
}
