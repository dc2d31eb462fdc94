//! YAML configuration loader with environment-specific overrides.
//!
//! Resolution order (later sources win):
//! 1. `config/orderflow.yaml`: base configuration
//! 2. `config/orderflow.{environment}.yaml`: environment overlay
//! 3. `ORDERFLOW__*` environment variables (`__` as section separator)
//!
//! The environment name comes from `ORDERFLOW_ENV`, falling back to
//! `development`. Both files are optional; missing files fall through to
//! the serde defaults on [`OrderflowConfig`].

use std::env;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use tracing::{debug, info};

use super::{ConfigurationError, OrderflowConfig};

/// Detect the current environment from `ORDERFLOW_ENV`.
pub fn detect_environment() -> String {
    env::var("ORDERFLOW_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Loads and caches the typed configuration tree.
#[derive(Debug)]
pub struct ConfigManager {
    config: OrderflowConfig,
    environment: String,
}

impl ConfigManager {
    /// Load configuration from the default `config/` directory.
    pub fn load() -> Result<Self, ConfigurationError> {
        Self::load_from_dir("config")
    }

    /// Load configuration from an explicit directory, for tests and
    /// deployments with non-standard layouts.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let environment = detect_environment();
        let dir = dir.as_ref();

        let base: PathBuf = dir.join("orderflow");
        let overlay: PathBuf = dir.join(format!("orderflow.{environment}"));

        debug!(
            environment = %environment,
            base = %base.display(),
            "loading configuration"
        );

        let source = Config::builder()
            .add_source(File::from(base).required(false))
            .add_source(File::from(overlay).required(false))
            .add_source(Environment::with_prefix("ORDERFLOW").separator("__"))
            .build()?;

        let config: OrderflowConfig = source.try_deserialize()?;
        config.validate()?;

        info!(environment = %environment, "configuration loaded");

        Ok(Self {
            config,
            environment,
        })
    }

    pub fn config(&self) -> &OrderflowConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}
