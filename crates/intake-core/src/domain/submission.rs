use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// A work submission as received from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(alias = "requestId")]
    pub id: String,
    pub user_id: String,
}

impl Submission {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
        }
    }

    /// Decode a raw JSON body. Both identifiers must be present and non-blank.
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        let submission: Submission =
            serde_json::from_slice(body).map_err(|e| RequestError::Malformed(e.to_string()))?;
        submission.validate()?;
        Ok(submission)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.id.trim().is_empty() {
            return Err(RequestError::Malformed("id must not be empty".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(RequestError::Malformed(
                "userId must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload handed to the work queue for an admitted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    pub request_id: String,
    pub user_id: String,
    #[serde(rename = "receivedAtTimestamp")]
    pub received_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn from_submission(submission: &Submission, received_at: DateTime<Utc>) -> Self {
        Self {
            request_id: submission.id.clone(),
            user_id: submission.user_id.clone(),
            received_at,
        }
    }
}

/// Marker stored for every request id taken into processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRecord {
    pub request_id: String,
    pub first_seen_at: DateTime<Utc>,
    pub retention_deadline: DateTime<Utc>,
}
