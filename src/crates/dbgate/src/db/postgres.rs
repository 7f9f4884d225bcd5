//! PostgreSQL connector
//!
//! Each call to [`PgConnector::connect`] opens a single unpooled connection;
//! the gate drops or closes it before the next attempt.

use super::{quote_identifier, AdminSession, Connector, CreateOutcome, DatabaseDescriptor};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use std::io;
use std::time::Duration;
use tracing::debug;

/// SQLSTATE raised by `CREATE DATABASE` for an existing name
const DUPLICATE_DATABASE: &str = "42P04";

/// SQLSTATE raised when two concurrent creates collide on the catalog index
const UNIQUE_VIOLATION: &str = "23505";

const EXISTS_QUERY: &str = "SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)";

/// Connector that opens real PostgreSQL connections
#[derive(Debug, Clone)]
pub struct PgConnector {
    connect_timeout: Duration,
}

impl PgConnector {
    /// Create a connector with the default 5 second connect timeout
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Create a connector with a custom per-attempt connect timeout
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Per-attempt connect timeout
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn options(descriptor: &DatabaseDescriptor, database: &str) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.user)
            .database(database)
            .application_name("dbgate");

        if descriptor.password.is_empty() {
            options
        } else {
            options.password(&descriptor.password)
        }
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        descriptor: &DatabaseDescriptor,
        database: &str,
    ) -> Result<Box<dyn AdminSession>, sqlx::Error> {
        let options = Self::options(descriptor, database);
        debug!(endpoint = %descriptor.endpoint(), database = %database, "Connecting");

        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| {
                sqlx::Error::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect timed out after {:?}", self.connect_timeout),
                ))
            })??;

        Ok(Box::new(PgAdminSession { conn }))
    }
}

/// Control connection backed by a single [`PgConnection`]
struct PgAdminSession {
    conn: PgConnection,
}

#[async_trait]
impl AdminSession for PgAdminSession {
    async fn database_exists(&mut self, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(EXISTS_QUERY)
            .bind(name)
            .fetch_one(&mut self.conn)
            .await
    }

    async fn create_database(&mut self, name: &str) -> Result<CreateOutcome, sqlx::Error> {
        // Unprepared statement; CREATE DATABASE cannot run inside a transaction block
        let statement = format!("CREATE DATABASE {}", quote_identifier(name));
        match self.conn.execute(statement.as_str()).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_duplicate_database(&err) => Ok(CreateOutcome::AlreadyExists),
            Err(err) => Err(err),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}

/// Whether `err` means the database already exists
pub fn is_duplicate_database(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => matches!(
            db_err.code().as_deref(),
            Some(DUPLICATE_DATABASE) | Some(UNIQUE_VIOLATION)
        ),
        _ => false,
    }
}
