//! Idempotent database provisioning
//!
//! Check-then-create without locking. Two gates racing on the same name are
//! tolerated: the loser sees a duplicate-database error, which counts as
//! success.

use crate::db::{AdminSession, Connector, CreateOutcome, DatabaseDescriptor};
use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What [`ensure_database_exists`] found or did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    /// The catalog already listed the database
    AlreadyPresent,
    /// This call created the database
    Created,
    /// Absent at check time, but another client created it first
    CreatedConcurrently,
}

impl std::fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyPresent => write!(f, "already present"),
            Self::Created => write!(f, "created"),
            Self::CreatedConcurrently => write!(f, "created concurrently"),
        }
    }
}

/// Ensure the target database exists, creating it if absent
///
/// Connects to the administrative database, looks the target name up in
/// `pg_database` and issues `CREATE DATABASE` when it is missing. The
/// control connection is closed before returning.
///
/// # Errors
/// [`GateError::ProvisioningFailed`] for any connect, query or create error
/// other than a duplicate-database report.
pub async fn ensure_database_exists<C>(
    connector: &C,
    descriptor: &DatabaseDescriptor,
) -> Result<ProvisionOutcome>
where
    C: Connector + ?Sized,
{
    let failed = |source: sqlx::Error| GateError::ProvisioningFailed {
        database: descriptor.name.clone(),
        source,
    };

    let mut session = connector
        .connect(descriptor, &descriptor.admin_database)
        .await
        .map_err(failed)?;

    let outcome = provision(session.as_mut(), &descriptor.name).await;

    if let Err(e) = session.close().await {
        debug!(database = %descriptor.name, error = %e, "Closing control connection failed");
    }

    let outcome = outcome.map_err(failed)?;
    match outcome {
        ProvisionOutcome::AlreadyPresent => {
            info!(database = %descriptor.name, "Database already exists");
        }
        ProvisionOutcome::Created => {
            info!(database = %descriptor.name, "Created database");
        }
        ProvisionOutcome::CreatedConcurrently => {
            warn!(
                database = %descriptor.name,
                "Database was created by another client between check and create"
            );
        }
    }
    Ok(outcome)
}

async fn provision(
    session: &mut dyn AdminSession,
    name: &str,
) -> std::result::Result<ProvisionOutcome, sqlx::Error> {
    if session.database_exists(name).await? {
        return Ok(ProvisionOutcome::AlreadyPresent);
    }

    debug!(database = %name, "Database missing, creating");
    match session.create_database(name).await? {
        CreateOutcome::Created => Ok(ProvisionOutcome::Created),
        CreateOutcome::AlreadyExists => Ok(ProvisionOutcome::CreatedConcurrently),
    }
}
