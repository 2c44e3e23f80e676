//! # Structured Logging Module
//!
//! Environment-aware structured logging for the treatment workflow and its session layer.

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging. Later calls are no-ops.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = detect_environment();
        let directive = if config.level.trim().is_empty() {
            default_log_level(&environment).to_string()
        } else {
            config.level.clone()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_filter(filter)
                .boxed()
        };

        // Use try_init so an embedding process that already installed a subscriber wins
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            environment = %environment,
            level = %directive,
            json = config.json,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn detect_environment() -> String {
    std::env::var("TREATMENT_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
pub fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for treatment lifecycle operations
pub fn log_treatment_operation(
    operation: &str,
    session_id: &str,
    trip_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        session_id = %session_id,
        trip_id = trip_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "TREATMENT_OPERATION"
    );
}
