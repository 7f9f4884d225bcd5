//! Error types for dbgate
//!
//! Provides a unified error type for the gate operations. Every variant is
//! fatal: the binary logs it and exits with a non-zero status.

use thiserror::Error;

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Main error type for gate operations
#[derive(Error, Debug)]
pub enum GateError {
    /// The server never accepted a connection within the attempt bound
    #[error("Database server {endpoint} unreachable after {attempts} attempt(s): {source}")]
    DatabaseUnreachable {
        /// `host:port` of the server that was polled
        endpoint: String,
        /// Number of connection attempts made
        attempts: u32,
        /// Error from the last attempt
        #[source]
        source: sqlx::Error,
    },

    /// The server was reachable but the existence check or creation failed
    #[error("Provisioning database '{database}' failed: {source}")]
    ProvisioningFailed {
        /// Target database name
        database: String,
        /// Underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The downstream test runner could not be started
    #[error("Failed to start test runner '{program}': {source}")]
    Runner {
        /// Program that was spawned
        program: String,
        /// Spawn error
        #[source]
        source: std::io::Error,
    },
}

impl GateError {
    /// Create a new Config error
    pub fn config(msg: impl Into<String>) -> Self {
        GateError::Config(msg.into())
    }

    /// Check if this is a readiness failure
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GateError::DatabaseUnreachable { .. })
    }

    /// Check if this is a provisioning failure
    pub fn is_provisioning_failure(&self) -> bool {
        matches!(self, GateError::ProvisioningFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    fn refused() -> sqlx::Error {
        sqlx::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"))
    }

    #[test]
    fn test_unreachable_display() {
        let err = GateError::DatabaseUnreachable {
            endpoint: "test-db:5432".to_string(),
            attempts: 30,
            source: refused(),
        };

        let msg = err.to_string();
        assert!(msg.contains("test-db:5432"));
        assert!(msg.contains("30 attempt(s)"));
        assert!(err.is_unreachable());
        assert!(!err.is_provisioning_failure());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_provisioning_failed_keeps_driver_error() {
        let err = GateError::ProvisioningFailed {
            database: "test_ecommerce".to_string(),
            source: refused(),
        };

        assert!(err.to_string().contains("'test_ecommerce'"));
        assert!(err.is_provisioning_failure());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_config_error() {
        let err = GateError::config("DB_NAME is not set");
        assert_eq!(err.to_string(), "Configuration error: DB_NAME is not set");
    }
}
