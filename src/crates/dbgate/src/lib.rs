//! # dbgate - Readiness and Provisioning Gate
//!
//! Holds test runs until a PostgreSQL server accepts connections and the
//! target database exists, then hands off to the test runner.
//!
//! ## Features
//!
//! - **Bounded readiness polling** - fixed retry interval, hard attempt ceiling
//! - **Idempotent provisioning** - catalog lookup then `CREATE DATABASE` if missing
//! - **Runner handoff** - extra arguments passed through verbatim, exit code propagated
//! - **Layered configuration** - defaults, TOML file, `DB_*` environment, CLI flags
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dbgate::{DatabaseDescriptor, Gate, PgConnector, ReadinessPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> dbgate::Result<()> {
//! let descriptor =
//!     DatabaseDescriptor::new("test-db", 5432, "postgres", "postgres", "test_ecommerce");
//! let policy = ReadinessPolicy::new(30, Duration::from_secs(1));
//!
//! let gate = Gate::new(PgConnector::new(), descriptor, policy);
//! let report = gate.open().await?;
//! println!("ready after {} attempt(s), database {}", report.attempts, report.outcome);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod gate;
pub mod health;
pub mod logging;
pub mod runner;
pub mod testing;

// Error types and utilities
mod error;

// Error types
pub use error::{GateError, Result};

// Re-export config types
pub use config::{ConfigLoader, GateConfig, load_config};

// Re-export database types
pub use db::{AdminSession, Connector, CreateOutcome, DatabaseDescriptor, PgConnector};

// Re-export gate operations
pub use gate::{
    ensure_database_exists, wait_until_ready, Gate, GateReport, ProvisionOutcome, ReadinessPolicy,
};

// Re-export health types
pub use health::{ComponentHealth, HealthChecker, HealthReport, HealthStatus};

pub use runner::TestRunner;
