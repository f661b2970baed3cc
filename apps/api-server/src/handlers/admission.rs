//! Admission handlers - quota setup and work submission.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use intake_core::domain::{Outcome, QuotaPolicy, Submission};
use intake_shared::ApiResponse;
use intake_shared::dto::{InitQuotaRequest, PolicyResponse, SubmissionResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn policy_response(policy: QuotaPolicy) -> PolicyResponse {
    PolicyResponse {
        user_id: policy.user_id,
        minute_limit: policy.minute_limit,
        month_limit: policy.month_limit,
    }
}

/// POST /api/quota/init
pub async fn init_quota(
    state: web::Data<AppState>,
    body: web::Json<InitQuotaRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let policy = state
        .engine
        .policies()
        .set_policy(&req.user_id, req.minute_limit, req.month_limit)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(policy_response(policy))))
}

/// GET /api/quota/{user_id}
pub async fn get_quota(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let policy = state.engine.policies().get_policy(&user_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(policy_response(policy))))
}

/// POST /api/data/processor
///
/// Takes the raw body so that unparseable payloads are answered as a
/// malformed submission rather than a framework error.
pub async fn submit(state: web::Data<AppState>, body: web::Bytes) -> AppResult<HttpResponse> {
    let received_at = Utc::now();

    let submission = Submission::parse(&body)
        .map_err(|e| AppError::Rejected(Outcome::RejectMalformed(e.to_string())))?;

    match state.engine.submit(&submission, received_at).await {
        Outcome::Admit => Ok(HttpResponse::Accepted().json(ApiResponse::ok_with_message(
            SubmissionResponse {
                request_id: submission.id,
                outcome: Outcome::Admit.label().to_string(),
                received_at,
            },
            "Submission accepted for processing",
        ))),
        rejected => Err(rejected.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::http::header::RETRY_AFTER;
    use actix_web::{App, test, web};
    use serde_json::{Value, json};

    use intake_core::AdmissionConfig;
    use intake_core::ports::WorkQueue;
    use intake_infra::{InMemoryCounterStore, InMemoryWorkQueue};

    use crate::handlers::configure_routes;
    use crate::state::AppState;

    fn memory_state() -> (AppState, Arc<InMemoryWorkQueue>) {
        let queue = Arc::new(InMemoryWorkQueue::default());
        let state = AppState::from_parts(
            Arc::new(InMemoryCounterStore::new()),
            queue.clone(),
            AdmissionConfig::default(),
            "memory",
        );
        (state, queue)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_init_quota_and_read_back() {
        let (state, _) = memory_state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/quota/init")
            .set_json(json!({"userId": "u1", "minuteLimit": 2, "monthLimit": 100}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/quota/u1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["minuteLimit"], 2);
        assert_eq!(body["data"]["monthLimit"], 100);
    }

    #[actix_web::test]
    async fn test_init_quota_rejects_invalid_limits() {
        let (state, _) = memory_state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/quota/init")
            .set_json(json!({"userId": "u1", "minuteLimit": 0, "monthLimit": 100}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = test::TestRequest::post()
            .uri("/api/quota/init")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_quota_is_not_found() {
        let (state, _) = memory_state();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/quota/ghost").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_submission_flow() {
        let (state, queue) = memory_state();
        state
            .engine
            .policies()
            .set_policy("u1", 100, 1)
            .await
            .unwrap();
        let app = app!(state);

        let submit = |id: &str, user: &str| {
            test::TestRequest::post()
                .uri("/api/data/processor")
                .set_json(json!({"id": id, "userId": user}))
                .to_request()
        };

        let resp = test::call_service(&app, submit("r1", "u1")).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["requestId"], "r1");
        assert_eq!(body["data"]["outcome"], "admit");

        let resp = test::call_service(&app, submit("r1", "u1")).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = test::call_service(&app, submit("r2", "u1")).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key(RETRY_AFTER));
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["outcome"], "reject_month_quota");
        assert!(body["retryAt"].is_string());

        // The overflow left a cooldown lock behind.
        let resp = test::call_service(&app, submit("r3", "u1")).await;
        assert_eq!(resp.status(), StatusCode::LOCKED);
        assert!(resp.headers().contains_key(RETRY_AFTER));

        let resp = test::call_service(&app, submit("r4", "nobody")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        assert_eq!(queue.depth("data-processor").await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn test_malformed_submission() {
        let (state, _) = memory_state();
        let app = app!(state);

        for payload in ["{\"id\": \"r1\"}", "not json", "{\"id\": \"\", \"userId\": \"u1\"}"] {
            let req = test::TestRequest::post()
                .uri("/api/data/processor")
                .set_payload(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload: {payload}");

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["outcome"], "reject_malformed");
        }
    }
}
