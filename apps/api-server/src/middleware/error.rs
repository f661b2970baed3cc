//! Error handling middleware - RFC 7807 compliant responses.

use actix_web::http::header::{HeaderValue, RETRY_AFTER};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use intake_core::PolicyError;
use intake_core::domain::{FailureCause, Outcome};
use intake_shared::ErrorResponse;
use std::fmt;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Validation(String),
    ServiceUnavailable(String),
    Internal(String),
    /// A submission the engine did not admit.
    Rejected(Outcome),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Rejected(outcome) => write!(f, "Submission rejected: {}", outcome.label()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Rejected(outcome) => outcome_status(outcome),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Validation(detail) => ErrorResponse::unprocessable(detail),
            AppError::ServiceUnavailable(detail) => ErrorResponse::service_unavailable(detail),
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
            AppError::Rejected(outcome) => outcome_problem(outcome),
        };

        let mut response = HttpResponse::build(self.status_code());
        if let Some(retry_at) = error.retry_at {
            response.insert_header((RETRY_AFTER, retry_after_seconds(retry_at, Utc::now())));
        }
        response.json(error)
    }
}

fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Admit => StatusCode::INTERNAL_SERVER_ERROR,
        Outcome::RejectMalformed(_) => StatusCode::BAD_REQUEST,
        Outcome::RejectDuplicate => StatusCode::CONFLICT,
        Outcome::RejectLocked(_) => StatusCode::LOCKED,
        Outcome::RejectUnknownUser => StatusCode::NOT_FOUND,
        Outcome::RejectMinuteQuota { .. } | Outcome::RejectMonthQuota { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
        Outcome::Fail(FailureCause::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        Outcome::Fail(FailureCause::QueueUnavailable) => StatusCode::BAD_GATEWAY,
    }
}

fn outcome_problem(outcome: &Outcome) -> ErrorResponse {
    let problem = match outcome {
        Outcome::Admit => ErrorResponse::internal_error(),
        Outcome::RejectMalformed(detail) => ErrorResponse::bad_request(detail),
        Outcome::RejectDuplicate => {
            ErrorResponse::conflict("A submission with this id was already received")
        }
        Outcome::RejectLocked(lock) => ErrorResponse::locked(format!(
            "User is in cooldown ({:?})",
            lock.reason
        )),
        Outcome::RejectUnknownUser => ErrorResponse::not_found("No quota policy for this user"),
        Outcome::RejectMinuteQuota { .. } => {
            ErrorResponse::too_many_requests("Per-minute quota exhausted")
        }
        Outcome::RejectMonthQuota { .. } => {
            ErrorResponse::too_many_requests("Per-month quota exhausted")
        }
        Outcome::Fail(FailureCause::StoreUnavailable) => {
            ErrorResponse::service_unavailable("Counter store unavailable")
        }
        Outcome::Fail(FailureCause::QueueUnavailable) => {
            ErrorResponse::bad_gateway("Work queue unavailable")
        }
    };

    let problem = problem.with_outcome(outcome.label());
    match outcome.retry_at() {
        Some(retry_at) => problem.with_retry_at(retry_at),
        None => problem,
    }
}

/// Whole seconds until `retry_at`, rounded up.
fn retry_after_seconds(retry_at: DateTime<Utc>, now: DateTime<Utc>) -> HeaderValue {
    let millis = (retry_at - now).num_milliseconds().max(0);
    HeaderValue::from((millis + 999) / 1000)
}

impl From<Outcome> for AppError {
    fn from(outcome: Outcome) -> Self {
        AppError::Rejected(outcome)
    }
}

// Conversion from domain errors
impl From<PolicyError> for AppError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::InvalidPolicy { .. } => AppError::Validation(err.to_string()),
            PolicyError::NotFound(_) => AppError::NotFound(err.to_string()),
            PolicyError::Corrupt { .. } => AppError::Internal(err.to_string()),
            PolicyError::Store(e) => {
                tracing::error!(error = %e, "Counter store error");
                AppError::ServiceUnavailable("Counter store unavailable".to_string())
            }
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc::now();

        assert_eq!(retry_after_seconds(now + Duration::milliseconds(1500), now), "2");
        assert_eq!(retry_after_seconds(now + Duration::seconds(60), now), "60");
        assert_eq!(retry_after_seconds(now - Duration::seconds(5), now), "0");
    }

    #[test]
    fn test_outcome_status_mapping() {
        let retry_at = Utc::now();

        assert_eq!(outcome_status(&Outcome::RejectDuplicate), StatusCode::CONFLICT);
        assert_eq!(outcome_status(&Outcome::RejectUnknownUser), StatusCode::NOT_FOUND);
        assert_eq!(
            outcome_status(&Outcome::RejectMonthQuota { retry_at }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            outcome_status(&Outcome::Fail(FailureCause::QueueUnavailable)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_policy_error_mapping() {
        let err: AppError = PolicyError::NotFound("u1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: AppError = PolicyError::InvalidPolicy {
            user_id: "u1".to_string(),
            reason: "minute limit must be positive".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
