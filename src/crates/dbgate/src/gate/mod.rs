//! Readiness-and-provisioning gate
//!
//! Two sequential steps must succeed before dependent work runs:
//! 1. [`wait_until_ready`] - the server accepts connections
//! 2. [`ensure_database_exists`] - the target database exists
//!
//! Both failures are fatal; the only retries happen inside step 1.

pub mod provision;
pub mod readiness;

pub use provision::{ensure_database_exists, ProvisionOutcome};
pub use readiness::{wait_until_ready, ReadinessPolicy};

use crate::db::{Connector, DatabaseDescriptor};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Summary of a successful gate pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Connection attempts used by the readiness step
    pub attempts: u32,
    /// Result of the provisioning step
    pub outcome: ProvisionOutcome,
}

/// Gate bound to one connector, target and policy
pub struct Gate<C> {
    connector: C,
    descriptor: DatabaseDescriptor,
    policy: ReadinessPolicy,
}

impl<C: Connector> Gate<C> {
    /// Create a new gate
    pub fn new(connector: C, descriptor: DatabaseDescriptor, policy: ReadinessPolicy) -> Self {
        Self {
            connector,
            descriptor,
            policy,
        }
    }

    /// Target descriptor
    pub fn descriptor(&self) -> &DatabaseDescriptor {
        &self.descriptor
    }

    /// Readiness policy
    pub fn policy(&self) -> &ReadinessPolicy {
        &self.policy
    }

    /// Underlying connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run only the readiness step
    pub async fn wait_until_ready(&self) -> Result<u32> {
        wait_until_ready(&self.connector, &self.descriptor, &self.policy).await
    }

    /// Run only the provisioning step
    pub async fn ensure_database_exists(&self) -> Result<ProvisionOutcome> {
        ensure_database_exists(&self.connector, &self.descriptor).await
    }

    /// Run readiness then provisioning
    pub async fn open(&self) -> Result<GateReport> {
        info!(
            endpoint = %self.descriptor.endpoint(),
            database = %self.descriptor.name,
            max_attempts = self.policy.max_attempts(),
            retry_interval_ms = self.policy.retry_interval().as_millis() as u64,
            "Waiting for database"
        );

        let attempts = self.wait_until_ready().await?;
        let outcome = self.ensure_database_exists().await?;

        info!(database = %self.descriptor.name, attempts, outcome = %outcome, "Gate open");
        Ok(GateReport { attempts, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use std::time::Duration;

    fn gate(connector: ScriptedConnector) -> Gate<ScriptedConnector> {
        Gate::new(
            connector,
            DatabaseDescriptor::new("test-db", 5432, "postgres", "postgres", "test_ecommerce"),
            ReadinessPolicy::new(5, Duration::from_millis(100)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_waits_then_provisions() {
        let gate = gate(ScriptedConnector::reachable_after(3));

        let report = gate.open().await.unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.outcome, ProvisionOutcome::Created);
        assert!(gate.connector().has_database("test_ecommerce"));
        // Three readiness attempts plus one control connection
        assert_eq!(gate.connector().attempts(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_is_idempotent() {
        let gate = gate(ScriptedConnector::reachable());

        gate.open().await.unwrap();
        let report = gate.open().await.unwrap();

        assert_eq!(report.outcome, ProvisionOutcome::AlreadyPresent);
        assert_eq!(gate.connector().create_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_never_provisions_unreachable_server() {
        let gate = gate(ScriptedConnector::unreachable());

        let err = gate.open().await.unwrap_err();

        assert!(err.is_unreachable());
        assert_eq!(gate.connector().attempts(), 5);
        assert_eq!(gate.connector().create_calls(), 0);
    }
}
