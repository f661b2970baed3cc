//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use anyhow::Context;
use chrono::FixedOffset;

use intake_core::AdmissionConfig;
use intake_core::admission::{DEFAULT_KEY_PREFIX, DEFAULT_QUEUE_NAME};
use intake_core::domain::ProcessingCalendar;
use intake_infra::InMemoryWorkQueueConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Set when `REDIS_URL` is present; backends are otherwise in-memory.
    pub redis_url: Option<String>,
    pub admission: AdmissionConfig,
    pub local_queue: InMemoryWorkQueueConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let duplicate_retention = match env::var("INTAKE_DUPLICATE_RETENTION_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("INTAKE_DUPLICATE_RETENTION_SECS={raw}"))?,
            ),
            Err(_) => AdmissionConfig::default().duplicate_retention,
        };

        let calendar = match env::var("INTAKE_PROCESSING_UTC_OFFSET") {
            Ok(raw) => ProcessingCalendar::with_offset(
                parse_utc_offset(&raw)
                    .with_context(|| format!("INTAKE_PROCESSING_UTC_OFFSET={raw}"))?,
            ),
            Err(_) => ProcessingCalendar::utc(),
        };

        let admission = AdmissionConfig {
            key_prefix: env::var("INTAKE_KEY_PREFIX")
                .unwrap_or_else(|_| DEFAULT_KEY_PREFIX.to_string()),
            queue_name: env::var("INTAKE_QUEUE_NAME")
                .unwrap_or_else(|_| DEFAULT_QUEUE_NAME.to_string()),
            duplicate_retention,
            calendar,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            admission,
            local_queue: InMemoryWorkQueueConfig::from_env(),
        })
    }
}

/// Parse `+03:30`, `-05:00`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    raw.parse::<FixedOffset>()
        .map_err(|e| anyhow::anyhow!("invalid UTC offset '{raw}': {e}"))
}
