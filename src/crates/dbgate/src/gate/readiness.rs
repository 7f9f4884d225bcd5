//! Readiness polling with a fixed retry interval
//!
//! Polls the administrative database until it accepts a connection or the
//! attempt bound is reached.

use crate::db::{Connector, DatabaseDescriptor};
use crate::error::{GateError, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Readiness polling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    max_attempts: u32,
    retry_interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            retry_interval: Duration::from_secs(1),
        }
    }
}

impl ReadinessPolicy {
    /// Create a new policy
    ///
    /// A zero attempt bound is raised to one so at least one attempt is made.
    pub fn new(max_attempts: u32, retry_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_interval,
        }
    }

    /// Maximum number of connection attempts
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between consecutive attempts
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }
}

/// Wait until the server accepts a connection to the administrative database
///
/// Returns the number of attempts used. Each successful connection is closed
/// immediately. No pause follows the final attempt, so an unreachable server
/// costs `(max_attempts - 1) * retry_interval` of sleeping plus connect time.
///
/// # Errors
/// [`GateError::DatabaseUnreachable`] once `max_attempts` connections failed.
pub async fn wait_until_ready<C>(
    connector: &C,
    descriptor: &DatabaseDescriptor,
    policy: &ReadinessPolicy,
) -> Result<u32>
where
    C: Connector + ?Sized,
{
    let endpoint = descriptor.endpoint();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match connector.connect(descriptor, &descriptor.admin_database).await {
            Ok(session) => {
                if let Err(e) = session.close().await {
                    debug!(endpoint = %endpoint, error = %e, "Closing readiness probe failed");
                }
                info!(endpoint = %endpoint, attempts, "Database server is accepting connections");
                return Ok(attempts);
            }
            Err(e) => {
                if attempts >= policy.max_attempts {
                    warn!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        error = %e,
                        "Connection failed, max attempts exhausted"
                    );
                    return Err(GateError::DatabaseUnreachable {
                        endpoint,
                        attempts,
                        source: e,
                    });
                }

                warn!(
                    endpoint = %endpoint,
                    attempt = attempts,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Database not ready, will retry"
                );
                sleep(policy.retry_interval).await;
            }
        }
    }
}
