use chrono::{DateTime, Utc};

use super::CooldownLock;

/// Infrastructure failure that stopped a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The counter store could not be read or written.
    StoreUnavailable,
    /// The submission was admitted but could not be handed to the work queue.
    /// Usage counters have already been charged.
    QueueUnavailable,
}

/// Terminal result of one admission decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Admit,
    RejectMalformed(String),
    RejectDuplicate,
    RejectLocked(CooldownLock),
    RejectUnknownUser,
    RejectMinuteQuota { retry_at: DateTime<Utc> },
    RejectMonthQuota { retry_at: DateTime<Utc> },
    Fail(FailureCause),
}

impl Outcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Outcome::Admit)
    }

    /// When the user may try again, for rejections that carry a deadline.
    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Outcome::RejectLocked(lock) => Some(lock.expires_at),
            Outcome::RejectMinuteQuota { retry_at } | Outcome::RejectMonthQuota { retry_at } => {
                Some(*retry_at)
            }
            _ => None,
        }
    }

    /// Stable label for logs and response bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Admit => "admit",
            Outcome::RejectMalformed(_) => "reject_malformed",
            Outcome::RejectDuplicate => "reject_duplicate",
            Outcome::RejectLocked(_) => "reject_locked",
            Outcome::RejectUnknownUser => "reject_unknown_user",
            Outcome::RejectMinuteQuota { .. } => "reject_minute_quota",
            Outcome::RejectMonthQuota { .. } => "reject_month_quota",
            Outcome::Fail(FailureCause::StoreUnavailable) => "fail_store_unavailable",
            Outcome::Fail(FailureCause::QueueUnavailable) => "fail_queue_unavailable",
        }
    }
}
