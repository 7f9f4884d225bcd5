//! Configuration loader
//!
//! Loads configuration from:
//! 1. Default values
//! 2. An optional TOML file
//! 3. Database environment variables (`DB_*`, `TEST_DB`)
//!
//! Later layers override earlier ones. CLI flags are applied by the binary
//! on top of the loaded result.

use crate::config::schema::GateConfig;
use crate::error::{GateError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration loader for the gate
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader that uses defaults and the environment only
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader that also reads the given TOML file
    ///
    /// Unlike environment variables, an explicitly named file must exist.
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Get the configured file path, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Load configuration using the process environment
    pub async fn load(&self) -> Result<GateConfig> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    /// Load configuration with an injected environment lookup
    pub async fn load_with_env<F>(&self, lookup: F) -> Result<GateConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = GateConfig::default();

        if let Some(path) = &self.config_path {
            let file_config = Self::load_from_path(path).await?;
            debug!(path = %path.display(), "Loaded config file");
            config.merge(file_config);
        }

        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    async fn load_from_path(path: &Path) -> Result<GateConfig> {
        if !path.exists() {
            return Err(GateError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GateError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| GateError::Config(format!("Failed to parse config: {}", e)))
    }
}
