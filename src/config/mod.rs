//! # Configuration System
//!
//! Typed configuration for the reconciliation core, loaded from YAML files
//! with environment-specific overrides. Every section carries defaults so a
//! missing file still yields a runnable configuration; explicit values win
//! over defaults, and `ORDERFLOW_*` environment variables win over files.

pub mod loader;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::{CircuitBreakerConfig, RecoveryLimiterConfig, RetryPolicy};

pub use loader::ConfigManager;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure mirroring `orderflow.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OrderflowConfig {
    pub logging: LoggingConfig,
    pub resilience: ResilienceConfig,
    pub recovery: RecoverySettings,
    pub delivery: DeliverySettings,
}

impl OrderflowConfig {
    /// Reject configurations that cannot work at runtime.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, breaker) in [
            ("payment_gateway", &self.resilience.payment_gateway),
            ("order_store", &self.resilience.order_store),
        ] {
            if breaker.failure_threshold == 0 {
                return Err(ConfigurationError::Invalid(format!(
                    "resilience.{name}.failure_threshold must be at least 1"
                )));
            }
            if breaker.success_threshold == 0 {
                return Err(ConfigurationError::Invalid(format!(
                    "resilience.{name}.success_threshold must be at least 1"
                )));
            }
        }
        if self.resilience.retry.max_attempts == 0 {
            return Err(ConfigurationError::Invalid(
                "resilience.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.recovery.max_attempts == 0 {
            return Err(ConfigurationError::Invalid(
                "recovery.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter, overridable via RUST_LOG.
    pub level: String,
    /// Emit an additional JSON layer for log shipping.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Breaker and retry settings per remote dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub payment_gateway: BreakerSettings,
    pub order_store: BreakerSettings,
    pub retry: RetrySettings,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            payment_gateway: BreakerSettings::from(CircuitBreakerConfig::payment_gateway()),
            order_store: BreakerSettings::from(CircuitBreakerConfig::dashboard()),
            retry: RetrySettings::default(),
        }
    }
}

/// Serializable form of [`CircuitBreakerConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: u64,
    pub monitoring_window_seconds: u64,
    pub success_threshold: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(CircuitBreakerConfig::default())
    }
}

impl From<CircuitBreakerConfig> for BreakerSettings {
    fn from(config: CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            recovery_timeout_seconds: config.recovery_timeout.as_secs(),
            monitoring_window_seconds: config.monitoring_window.as_secs(),
            success_threshold: config.success_threshold,
        }
    }
}

impl BreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_seconds),
            monitoring_window: Duration::from_secs(self.monitoring_window_seconds),
            success_threshold: self.success_threshold,
        }
    }
}

/// Serializable form of [`RetryPolicy`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            timeout_ms: policy.timeout.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

/// Serializable form of [`RecoveryLimiterConfig`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoverySettings {
    pub max_attempts: u32,
    pub cooldown_seconds: u64,
    pub emergency_max_attempts: u32,
    pub emergency_cooldown_seconds: u64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        let config = RecoveryLimiterConfig::default();
        Self {
            max_attempts: config.max_attempts,
            cooldown_seconds: config.cooldown.as_secs(),
            emergency_max_attempts: config.emergency_max_attempts,
            emergency_cooldown_seconds: config.emergency_cooldown.as_secs(),
        }
    }
}

impl RecoverySettings {
    pub fn to_limiter_config(&self) -> RecoveryLimiterConfig {
        RecoveryLimiterConfig {
            max_attempts: self.max_attempts,
            cooldown: Duration::from_secs(self.cooldown_seconds),
            emergency_max_attempts: self.emergency_max_attempts,
            emergency_cooldown: Duration::from_secs(self.emergency_cooldown_seconds),
        }
    }
}

/// Delivery capacity analysis settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// How many reschedule suggestions to surface.
    pub max_recommendations: usize,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_recommendations: 5,
        }
    }
}
