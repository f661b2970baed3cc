//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to create or replace a user's quota policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitQuotaRequest {
    pub user_id: String,
    #[serde(alias = "minuteQuota")]
    pub minute_limit: i64,
    #[serde(alias = "monthQuota")]
    pub month_limit: i64,
}

/// A stored quota policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResponse {
    pub user_id: String,
    pub minute_limit: i64,
    pub month_limit: i64,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub request_id: String,
    /// Outcome label, e.g. `admit`.
    pub outcome: String,
    pub received_at: DateTime<Utc>,
}
