//! Database access seam
//!
//! The gate talks to the server only through [`Connector`] and
//! [`AdminSession`]. [`postgres::PgConnector`] is the production
//! implementation; tests plug in [`crate::testing::ScriptedConnector`].

pub mod postgres;

use crate::error::{GateError, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use url::Url;

pub use postgres::PgConnector;

/// Target database descriptor
///
/// Built once from configuration and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseDescriptor {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// Administrative user
    pub user: String,
    /// Administrative password
    pub password: String,
    /// Logical database to provision
    pub name: String,
    /// Database used for control connections
    pub admin_database: String,
}

impl DatabaseDescriptor {
    /// Create a descriptor with the default `postgres` administrative database
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            name: name.into(),
            admin_database: "postgres".to_string(),
        }
    }

    /// `host:port` of the server, with IPv6 literals bracketed
    pub fn endpoint(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => format!("[{}]:{}", addr, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    /// Connection URL for the target database
    pub fn database_url(&self) -> Result<Url> {
        self.url_for(&self.name)
    }

    /// Connection URL for the administrative database
    pub fn admin_url(&self) -> Result<Url> {
        self.url_for(&self.admin_database)
    }

    fn url_for(&self, database: &str) -> Result<Url> {
        let invalid = |what: &str| GateError::config(format!("cannot build connection URL: invalid {}", what));

        let mut url = Url::parse("postgresql://localhost/")
            .map_err(|e| GateError::config(format!("cannot build connection URL: {}", e)))?;

        match self.host.parse::<IpAddr>() {
            Ok(ip) => url.set_ip_host(ip).map_err(|_| invalid("host"))?,
            Err(_) => url
                .set_host(Some(&self.host))
                .map_err(|e| GateError::config(format!("invalid host '{}': {}", self.host, e)))?,
        }
        url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
        url.set_username(&self.user).map_err(|_| invalid("user"))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| invalid("password"))?;
        }
        url.path_segments_mut()
            .map_err(|_| invalid("database name"))?
            .clear()
            .push(database);

        Ok(url)
    }
}

impl std::fmt::Debug for DatabaseDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("admin_database", &self.admin_database)
            .finish()
    }
}

/// Result of a `CREATE DATABASE` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// This session created the database
    Created,
    /// The server reported the database already exists
    AlreadyExists,
}

/// Opens control connections to a database server
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection to `database` on the server described by `descriptor`
    async fn connect(
        &self,
        descriptor: &DatabaseDescriptor,
        database: &str,
    ) -> std::result::Result<Box<dyn AdminSession>, sqlx::Error>;
}

/// An open control connection
#[async_trait]
pub trait AdminSession: Send {
    /// Exact-match lookup of `name` in the server catalog
    async fn database_exists(&mut self, name: &str) -> std::result::Result<bool, sqlx::Error>;

    /// Create the database `name`
    ///
    /// A duplicate-database error from the server is reported as
    /// [`CreateOutcome::AlreadyExists`], not as an error.
    async fn create_database(&mut self, name: &str) -> std::result::Result<CreateOutcome, sqlx::Error>;

    /// Close the connection
    async fn close(self: Box<Self>) -> std::result::Result<(), sqlx::Error>;
}

/// Quote a PostgreSQL identifier, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
