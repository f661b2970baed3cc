use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WindowKind;

/// Why a user was put into cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockReason {
    MinuteExceeded,
    MonthExceeded,
}

impl From<WindowKind> for LockReason {
    fn from(kind: WindowKind) -> Self {
        match kind {
            WindowKind::Minute => LockReason::MinuteExceeded,
            WindowKind::Month => LockReason::MonthExceeded,
        }
    }
}

/// Temporary block on admissions for a user who exhausted a quota window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownLock {
    pub user_id: String,
    pub reason: LockReason,
    pub expires_at: DateTime<Utc>,
}

impl CooldownLock {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
