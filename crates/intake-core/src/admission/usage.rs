//! Usage counter - per-user minute and calendar-month windows.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{ProcessingCalendar, UsageWindow, WindowKind};
use crate::ports::{CounterStore, StoreError};

use super::keys::KeySpace;

pub struct UsageCounter {
    store: Arc<dyn CounterStore>,
    keys: KeySpace,
    calendar: ProcessingCalendar,
}

impl UsageCounter {
    pub fn new(store: Arc<dyn CounterStore>, keys: KeySpace, calendar: ProcessingCalendar) -> Self {
        Self {
            store,
            keys,
            calendar,
        }
    }

    /// Charge one request against the `kind` window containing `now`.
    ///
    /// The first increment of a window creates its counter with an expiry at
    /// the window end, atomically.
    pub async fn increment(
        &self,
        user_id: &str,
        kind: WindowKind,
        now: DateTime<Utc>,
    ) -> Result<UsageWindow, StoreError> {
        let bounds = self.calendar.bounds(kind, now);
        let key = self.keys.usage(kind, bounds.start, user_id);

        let count = self.store.increment(&key, bounds.ttl_from(now)).await?;

        tracing::trace!(user_id = %user_id, window = %kind, count, "Usage incremented");

        Ok(UsageWindow {
            user_id: user_id.to_string(),
            kind,
            count,
            start: bounds.start,
            end: bounds.end,
        })
    }

    /// Current count without charging. Zero when the window has not started.
    pub async fn current(
        &self,
        user_id: &str,
        kind: WindowKind,
        now: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let bounds = self.calendar.bounds(kind, now);
        let raw = self
            .store
            .get(&self.keys.usage(kind, bounds.start, user_id))
            .await?;

        match raw {
            Some(value) => value
                .parse()
                .map_err(|e: std::num::ParseIntError| StoreError::Serialization(e.to_string())),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::testing::MapStore;
    use chrono::TimeZone;

    fn counter() -> UsageCounter {
        UsageCounter::new(
            Arc::new(MapStore::new()),
            KeySpace::default(),
            ProcessingCalendar::utc(),
        )
    }

    #[tokio::test]
    async fn test_increment_counts_within_window() {
        let counter = counter();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 5).unwrap();

        let first = counter.increment("u1", WindowKind::Minute, now).await.unwrap();
        let second = counter
            .increment("u1", WindowKind::Minute, now + chrono::Duration::seconds(30))
            .await
            .unwrap();

        assert_eq!(first.count, 1);
        assert_eq!(second.count, 2);
        assert_eq!(second.end, Utc.with_ymd_and_hms(2024, 5, 1, 10, 1, 0).unwrap());
    }

    #[tokio::test]
    async fn test_next_minute_starts_fresh_window() {
        let counter = counter();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 59).unwrap();

        counter.increment("u1", WindowKind::Minute, now).await.unwrap();
        counter.increment("u1", WindowKind::Minute, now).await.unwrap();
        let next = counter
            .increment("u1", WindowKind::Minute, now + chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(next.count, 1);
    }

    #[tokio::test]
    async fn test_windows_are_independent_per_kind_and_user() {
        let counter = counter();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();

        counter.increment("u1", WindowKind::Minute, now).await.unwrap();
        counter.increment("u1", WindowKind::Minute, now).await.unwrap();
        counter.increment("u1", WindowKind::Month, now).await.unwrap();
        counter.increment("u2", WindowKind::Minute, now).await.unwrap();

        assert_eq!(counter.current("u1", WindowKind::Minute, now).await.unwrap(), 2);
        assert_eq!(counter.current("u1", WindowKind::Month, now).await.unwrap(), 1);
        assert_eq!(counter.current("u2", WindowKind::Minute, now).await.unwrap(), 1);
        assert_eq!(counter.current("u2", WindowKind::Month, now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MapStore::new());
        store.fail_keys_containing(":usage:");
        let counter = UsageCounter::new(store, KeySpace::default(), ProcessingCalendar::utc());

        let result = counter.increment("u1", WindowKind::Month, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
