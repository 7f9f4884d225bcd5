//! Configuration schema for the gate

use crate::db::DatabaseDescriptor;
use crate::error::{GateError, Result};
use crate::gate::ReadinessPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main gate configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GateConfig {
    /// Target database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Readiness polling configuration
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Test runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
}

/// Target database configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Server host name
    pub host: String,

    /// Server port
    pub port: u16,

    /// Administrative user
    pub user: String,

    /// Administrative password (supports `${VAR}` interpolation)
    pub password: String,

    /// Logical database to provision
    pub name: Option<String>,

    /// Database used for control connections
    pub admin_database: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: None,
            admin_database: "postgres".to_string(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("admin_database", &self.admin_database)
            .finish()
    }
}

/// Readiness polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Maximum number of connection attempts
    pub max_attempts: u32,

    /// Pause between attempts in milliseconds
    pub retry_interval_ms: u64,

    /// Upper bound on a single connection attempt in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            retry_interval_ms: 1000,
            connect_timeout_ms: 5000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Log format: "compact", "pretty", "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Program invoked after the gate opens
    pub program: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "pytest".to_string(),
        }
    }
}

impl GateConfig {
    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: GateConfig) {
        // Section replacement; serde fills in defaults for missing fields
        self.database = other.database;
        self.readiness = other.readiness;
        self.logging = other.logging;
        self.runner = other.runner;
    }

    /// Overlay database settings from the environment
    ///
    /// Reads `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` and
    /// `DB_ADMIN_NAME`. `TEST_DB`, when set, wins over `DB_NAME`. Values in
    /// the form `${VAR}` are expanded through the same lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;

        if let Some(host) = lookup("DB_HOST") {
            db.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            db.port = port
                .trim()
                .parse()
                .map_err(|_| GateError::config(format!("DB_PORT is not a valid port: {:?}", port)))?;
        }
        if let Some(user) = lookup("DB_USER") {
            db.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            db.password = password;
        }
        if let Some(name) = lookup("DB_NAME") {
            db.name = Some(name);
        }
        if let Some(name) = lookup("TEST_DB") {
            db.name = Some(name);
        }
        if let Some(admin) = lookup("DB_ADMIN_NAME") {
            db.admin_database = admin;
        }

        db.password = expand_env_var(&db.password, &lookup);
        db.host = expand_env_var(&db.host, &lookup);
        db.user = expand_env_var(&db.user, &lookup);
        Ok(())
    }

    /// Build the immutable target descriptor, validating required fields
    pub fn descriptor(&self) -> Result<DatabaseDescriptor> {
        let db = &self.database;

        let name = db
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| GateError::config("target database name is not set (DB_NAME)"))?;

        if db.host.trim().is_empty() {
            return Err(GateError::config("database host is empty (DB_HOST)"));
        }
        if db.port == 0 {
            return Err(GateError::config("database port must be greater than 0 (DB_PORT)"));
        }
        if db.user.trim().is_empty() {
            return Err(GateError::config("database user is empty (DB_USER)"));
        }
        if db.admin_database.trim().is_empty() {
            return Err(GateError::config("administrative database name is empty"));
        }

        Ok(DatabaseDescriptor {
            host: db.host.trim().to_string(),
            port: db.port,
            user: db.user.clone(),
            password: db.password.clone(),
            name: name.to_string(),
            admin_database: db.admin_database.trim().to_string(),
        })
    }

    /// Build the readiness policy, rejecting zero bounds
    pub fn readiness_policy(&self) -> Result<ReadinessPolicy> {
        let r = &self.readiness;
        if r.max_attempts == 0 {
            return Err(GateError::config("max_attempts must be greater than 0"));
        }
        if r.retry_interval_ms == 0 {
            return Err(GateError::config("retry_interval_ms must be greater than 0"));
        }
        Ok(ReadinessPolicy::new(r.max_attempts, Duration::from_millis(r.retry_interval_ms)))
    }

    /// Per-attempt connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness.connect_timeout_ms.max(1))
    }

    /// Render the configuration as TOML with the password redacted
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        if !shown.database.password.is_empty() {
            shown.database.password = "<redacted>".to_string();
        }
        toml::to_string_pretty(&shown)
            .map_err(|e| GateError::config(format!("Failed to render config: {}", e)))
    }
}

/// Expand an environment variable reference
///
/// Supports `${VAR_NAME}` syntax; unresolved references are left as-is.
fn expand_env_var<F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if value.starts_with("${") && value.ends_with('}') && value.len() > 3 {
        let var_name = &value[2..value.len() - 1];
        lookup(var_name).unwrap_or_else(|| value.to_string())
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.admin_database, "postgres");
        assert_eq!(config.readiness.max_attempts, 30);
        assert_eq!(config.readiness.retry_interval_ms, 1000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.runner.program, "pytest");
    }

    #[test]
    fn test_env_builds_descriptor() {
        let mut config = GateConfig::default();
        config
            .apply_env(env(&[
                ("DB_HOST", "test-db"),
                ("DB_PORT", "5432"),
                ("DB_USER", "postgres"),
                ("DB_PASSWORD", "postgres"),
                ("DB_NAME", "test_ecommerce"),
            ]))
            .unwrap();

        let descriptor = config.descriptor().unwrap();
        assert_eq!(descriptor.host, "test-db");
        assert_eq!(descriptor.port, 5432);
        assert_eq!(descriptor.user, "postgres");
        assert_eq!(descriptor.password, "postgres");
        assert_eq!(descriptor.name, "test_ecommerce");
        assert_eq!(descriptor.admin_database, "postgres");
    }

    #[test]
    fn test_test_db_overrides_db_name() {
        let mut config = GateConfig::default();
        config
            .apply_env(env(&[("DB_NAME", "ecommerce"), ("TEST_DB", "test_ecommerce")]))
            .unwrap();
        assert_eq!(config.descriptor().unwrap().name, "test_ecommerce");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let mut config = GateConfig::default();
        let err = config.apply_env(env(&[("DB_PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_missing_name_is_config_error() {
        let config = GateConfig::default();
        let err = config.descriptor().unwrap_err();
        assert!(err.to_string().contains("DB_NAME"));

        let mut blank = GateConfig::default();
        blank.database.name = Some("   ".to_string());
        assert!(blank.descriptor().is_err());
    }

    #[test]
    fn test_password_env_var_expansion() {
        let mut config = GateConfig::default();
        config.database.password = "${PGPASSWORD}".to_string();
        config.apply_env(env(&[("PGPASSWORD", "s3cret")])).unwrap();
        assert_eq!(config.database.password, "s3cret");

        let mut unresolved = GateConfig::default();
        unresolved.database.password = "${MISSING}".to_string();
        unresolved.apply_env(env(&[])).unwrap();
        assert_eq!(unresolved.database.password, "${MISSING}");
    }

    #[test]
    fn test_readiness_policy_rejects_zero() {
        let mut config = GateConfig::default();
        config.readiness.max_attempts = 0;
        assert!(config.readiness_policy().is_err());

        let mut config = GateConfig::default();
        config.readiness.retry_interval_ms = 0;
        assert!(config.readiness_policy().is_err());

        let policy = GateConfig::default().readiness_policy().unwrap();
        assert_eq!(policy.max_attempts(), 30);
        assert_eq!(policy.retry_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_merge_config() {
        let mut base = GateConfig::default();
        let mut other = GateConfig::default();
        other.database.host = "db.internal".to_string();
        other.readiness.max_attempts = 5;

        base.merge(other);

        assert_eq!(base.database.host, "db.internal");
        assert_eq!(base.readiness.max_attempts, 5);
        assert_eq!(base.logging.format, "compact");
    }

    #[test]
    fn test_partial_section_deserializes_with_defaults() {
        let toml = r#"
            [database]
            name = "test_ecommerce"

            [readiness]
            max_attempts = 10
        "#;

        let config: GateConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.database.name.as_deref(), Some("test_ecommerce"));
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.readiness.max_attempts, 10);
        assert_eq!(config.readiness.retry_interval_ms, 1000);
    }

    #[test]
    fn test_redacted_output_hides_password() {
        let mut config = GateConfig::default();
        config.database.password = "hunter2".to_string();

        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
