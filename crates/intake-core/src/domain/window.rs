//! Usage windows and their calendar boundaries.
//!
//! Minute windows run from the start of a wall-clock minute to the start of
//! the next one. Month windows run from midnight on the first day of the
//! month to 23:59:59.999 on its last day. Both are computed in the
//! processing timezone, a fixed UTC offset.

use std::time::Duration;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};

/// The two usage windows tracked per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Minute,
    Month,
}

impl WindowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::Minute => "minute",
            WindowKind::Month => "month",
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start and end instants of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WindowBounds {
    /// Time left until the window closes, never less than one millisecond
    /// so that a store TTL derived from it always expires the key.
    pub fn ttl_from(&self, now: DateTime<Utc>) -> Duration {
        ttl_until(self.end, now)
    }
}

/// Remaining time from `now` until `deadline`, floored at one millisecond.
pub fn ttl_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now)
        .to_std()
        .unwrap_or(Duration::ZERO)
        .max(Duration::from_millis(1))
}

/// A live usage window after an increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageWindow {
    pub user_id: String,
    pub kind: WindowKind,
    pub count: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Computes window boundaries in the processing timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingCalendar {
    offset: FixedOffset,
}

impl Default for ProcessingCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl ProcessingCalendar {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Boundaries of the `kind` window containing `now`.
    pub fn bounds(&self, kind: WindowKind, now: DateTime<Utc>) -> WindowBounds {
        let local = now.with_timezone(&self.offset).naive_local();

        let bounds = match kind {
            WindowKind::Minute => self.minute_bounds(local),
            WindowKind::Month => self.month_bounds(local),
        };

        // Only reachable at the edges of chrono's representable range.
        bounds.unwrap_or(WindowBounds {
            start: now,
            end: DateTime::<Utc>::MAX_UTC,
        })
    }

    fn minute_bounds(&self, local: NaiveDateTime) -> Option<WindowBounds> {
        let start = local.date().and_hms_opt(local.hour(), local.minute(), 0)?;
        let end = start.checked_add_signed(chrono::Duration::minutes(1))?;

        Some(WindowBounds {
            start: self.to_utc(start)?,
            end: self.to_utc(end)?,
        })
    }

    fn month_bounds(&self, local: NaiveDateTime) -> Option<WindowBounds> {
        let (year, month) = (local.year(), local.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };

        let first = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
        let last_day = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
        let end = last_day.and_hms_milli_opt(23, 59, 59, 999)?;

        Some(WindowBounds {
            start: self.to_utc(first)?,
            end: self.to_utc(end)?,
        })
    }

    fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }
}
