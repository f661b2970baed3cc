//! HTTP handlers and route configuration.

mod admission;
mod health;

use actix_web::web;

use crate::middleware::error::AppError;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Quota policies
            .service(
                web::scope("/quota")
                    .route("/init", web::post().to(admission::init_quota))
                    .route("/{user_id}", web::get().to(admission::get_quota)),
            )
            // Work submission
            .route("/data/processor", web::post().to(admission::submit)),
    );
}
