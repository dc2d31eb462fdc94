//! # Structured Logging Module
//!
//! Environment-aware structured logging for debugging reconciliation flows
//! and resilience state changes. Console output is human-readable; the
//! optional JSON layer is intended for log shipping in deployed
//! environments.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
/// If a global subscriber is already set (for example by a test harness),
/// initialization silently defers to it.
pub fn init_logging(config: &LoggingConfig) {
    let level = config.level.clone();
    let json = config.json;

    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

        let console_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(filter);

        let json_layer = if json {
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(&level)),
            )
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(json_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(level = %level, json = json, "🔧 Structured logging initialized");
        }
    });
}

/// Initialize logging with default settings (info level, console only).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
