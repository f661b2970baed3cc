//! Health check endpoint.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub backend: &'static str,
    /// Whether scheduled maintenance jobs are firing.
    pub background_jobs: bool,
    pub queue: QueueHealth,
}

#[derive(Serialize)]
pub struct QueueHealth {
    pub name: String,
    /// Items waiting; absent when the queue backend could not be reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
}

/// Health check endpoint - returns server status and work queue depth.
///
/// GET /api/health
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let engine = &state.engine;
    let depth = match engine.queue().depth(engine.queue_name()).await {
        Ok(depth) => Some(depth),
        Err(e) => {
            tracing::warn!(error = %e, "Work queue depth unavailable");
            None
        }
    };

    let response = HealthResponse {
        status: if depth.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        backend: state.backend,
        background_jobs: state.scheduler.as_ref().is_some_and(|s| s.is_enabled()),
        queue: QueueHealth {
            name: engine.queue_name().to_string(),
            depth,
        },
    };

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};
    use serde_json::Value;

    use intake_core::AdmissionConfig;
    use intake_core::domain::WorkItem;
    use intake_core::ports::WorkQueue;
    use intake_infra::{InMemoryCounterStore, InMemoryWorkQueue};

    use crate::handlers::configure_routes;
    use crate::state::AppState;

    #[actix_web::test]
    async fn test_health_reports_queue_depth() {
        let queue = Arc::new(InMemoryWorkQueue::default());
        let item = WorkItem {
            request_id: "r1".to_string(),
            user_id: "u1".to_string(),
            received_at: chrono::Utc::now(),
        };
        queue.enqueue("data-processor", &item).await.unwrap();

        let state = AppState::from_parts(
            Arc::new(InMemoryCounterStore::new()),
            queue,
            AdmissionConfig::default(),
            "memory",
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["background_jobs"], false);
        assert_eq!(body["queue"]["name"], "data-processor");
        assert_eq!(body["queue"]["depth"], 1);
    }
}
