use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Quota policy for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaPolicy {
    pub user_id: String,
    pub minute_limit: i64,
    pub month_limit: i64,
}

impl QuotaPolicy {
    /// Build a validated policy. Both limits must be strictly positive.
    pub fn new(
        user_id: impl Into<String>,
        minute_limit: i64,
        month_limit: i64,
    ) -> Result<Self, PolicyError> {
        let user_id = user_id.into();

        let reason = if user_id.trim().is_empty() {
            Some("user id must not be empty".to_string())
        } else if minute_limit <= 0 {
            Some(format!("minute limit must be positive, got {}", minute_limit))
        } else if month_limit <= 0 {
            Some(format!("month limit must be positive, got {}", month_limit))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(PolicyError::InvalidPolicy { user_id, reason }),
            None => Ok(Self {
                user_id,
                minute_limit,
                month_limit,
            }),
        }
    }
}
