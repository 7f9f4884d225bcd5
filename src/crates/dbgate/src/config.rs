//! Configuration management for the gate
//!
//! The configuration is built once at startup and injected into the gate;
//! nothing downstream reads the process environment.
//!
//! Priority order:
//! 1. Default values
//! 2. Optional TOML file (`--config`)
//! 3. Database environment variables
//! 4. CLI flags

mod schema;
mod loader;

pub use schema::{GateConfig, DatabaseConfig, ReadinessConfig, LoggingConfig, RunnerConfig};
pub use loader::ConfigLoader;

use crate::Result;
use std::path::Path;

/// Load configuration from an optional file and the process environment
pub async fn load_config(path: Option<&Path>) -> Result<GateConfig> {
    let loader = match path {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    loader.load().await
}
