//! `dbgate check`
//!
//! One-shot check of the database server and the target database, without
//! retries and without creating anything.

use crate::db::{Connector, DatabaseDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Result of one check, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Server up, target database missing
    Degraded,
    /// Server down or catalog unreadable
    Unhealthy,
}

impl HealthStatus {
    /// Marker used in the text table
    pub fn icon(self) -> &'static str {
        match self {
            Self::Healthy => "✓",
            Self::Degraded => "⚠",
            Self::Unhealthy => "✗",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// Outcome for a single component (`server` or `database`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

impl ComponentHealth {
    pub fn ok(component: &str, elapsed_ms: u64) -> Self {
        Self {
            component: component.to_string(),
            status: HealthStatus::Healthy,
            detail: None,
            elapsed_ms,
        }
    }

    pub fn with_status(
        component: &str,
        status: HealthStatus,
        detail: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            component: component.to_string(),
            status,
            detail: Some(detail.into()),
            elapsed_ms,
        }
    }
}

/// Report printed by `dbgate check`
///
/// `status` is the worst status among `components`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
    pub elapsed_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let status = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);
        let elapsed_ms = components.iter().map(|c| c.elapsed_ms).sum();

        Self {
            status,
            components,
            elapsed_ms,
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// Health checker for the gate target
pub struct HealthChecker;

impl HealthChecker {
    /// Probe the server and look up the target database
    ///
    /// A failed connection skips the catalog lookup and reports the
    /// `database` component as unhealthy too.
    pub async fn check<C>(connector: &C, descriptor: &DatabaseDescriptor) -> HealthReport
    where
        C: Connector + ?Sized,
    {
        let start = Instant::now();
        let mut components = Vec::with_capacity(2);

        let mut session = match connector.connect(descriptor, &descriptor.admin_database).await {
            Ok(session) => {
                components.push(ComponentHealth::ok("server", elapsed_ms(start)));
                session
            }
            Err(e) => {
                components.push(ComponentHealth::with_status(
                    "server",
                    HealthStatus::Unhealthy,
                    format!("{} unreachable: {}", descriptor.endpoint(), e),
                    elapsed_ms(start),
                ));
                components.push(ComponentHealth::with_status(
                    "database",
                    HealthStatus::Unhealthy,
                    "server unreachable",
                    0,
                ));
                return HealthReport::from_components(components);
            }
        };

        let lookup_start = Instant::now();
        let database = match session.database_exists(&descriptor.name).await {
            Ok(true) => ComponentHealth::ok("database", elapsed_ms(lookup_start)),
            Ok(false) => ComponentHealth::with_status(
                "database",
                HealthStatus::Degraded,
                format!("database '{}' does not exist", descriptor.name),
                elapsed_ms(lookup_start),
            ),
            Err(e) => ComponentHealth::with_status(
                "database",
                HealthStatus::Unhealthy,
                format!("catalog query failed: {}", e),
                elapsed_ms(lookup_start),
            ),
        };
        components.push(database);

        if let Err(e) = session.close().await {
            debug!(endpoint = %descriptor.endpoint(), error = %e, "Closing health check connection failed");
        }
        HealthReport::from_components(components)
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
