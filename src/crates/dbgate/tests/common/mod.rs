//! Common test utilities and setup

#![allow(dead_code)]

use async_trait::async_trait;
use dbgate::{AdminSession, Connector, DatabaseDescriptor, PgConnector};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use std::env;
use std::sync::atomic::{AtomicU32, Ordering};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

static TEST_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A PostgreSQL server for live tests
///
/// Uses `DBGATE_TEST_PG_HOST` / `DBGATE_TEST_PG_PORT` when set, otherwise
/// starts a throwaway container.
pub struct PgFixture {
    pub host: String,
    pub port: u16,
    _container: Option<ContainerAsync<GenericImage>>,
}

impl PgFixture {
    pub async fn start() -> Self {
        if let Ok(host) = env::var("DBGATE_TEST_PG_HOST") {
            let port = env::var("DBGATE_TEST_PG_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432);
            return Self {
                host,
                port,
                _container: None,
            };
        }

        let container = GenericImage::new("postgres", "16-alpine")
            .with_exposed_port(5432.tcp())
            // The init phase only listens on a unix socket; wait for the TCP listener
            .with_wait_for(WaitFor::message_on_stderr("port 5432"))
            .with_env_var("POSTGRES_USER", "postgres")
            .with_env_var("POSTGRES_PASSWORD", "postgres")
            .with_env_var("POSTGRES_DB", "postgres")
            .start()
            .await
            .expect("Failed to start postgres container");

        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .expect("Failed to resolve postgres port");

        Self {
            host: "127.0.0.1".to_string(),
            port,
            _container: Some(container),
        }
    }

    /// Descriptor for `name` on this server
    pub fn descriptor(&self, name: &str) -> DatabaseDescriptor {
        DatabaseDescriptor::new(self.host.clone(), self.port, "postgres", "postgres", name)
    }

    /// Whether this fixture points at a server that outlives the test run
    pub fn is_external(&self) -> bool {
        self._container.is_none()
    }

    /// Drop `name` if it exists
    pub async fn drop_database(&self, name: &str) {
        let mut conn = connect_url(&self.descriptor(name).admin_url().expect("admin url").as_str()).await;
        conn.execute(format!("DROP DATABASE IF EXISTS {}", dbgate::db::quote_identifier(name)).as_str())
            .await
            .expect("Failed to drop database");
        conn.close().await.expect("Failed to close connection");
    }

    /// Whether the server catalog lists `name`
    pub async fn database_exists(&self, name: &str) -> bool {
        let descriptor = self.descriptor(name);
        let mut session = PgConnector::new()
            .connect(&descriptor, "postgres")
            .await
            .expect("Failed to connect for catalog lookup");
        let exists = session
            .database_exists(name)
            .await
            .expect("Catalog lookup failed");
        session.close().await.expect("Failed to close session");
        exists
    }
}

/// Open a connection from a `postgresql://` URL
pub async fn connect_url(url: &str) -> PgConnection {
    let options: PgConnectOptions = url.parse().expect("Invalid connection URL");
    PgConnection::connect_with(&options)
        .await
        .expect("Failed to connect with URL")
}

/// Unique database name so tests sharing a server do not collide
pub fn unique_db_name(prefix: &str) -> String {
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, std::process::id(), counter)
}

/// Descriptor pointing at a loopback port nothing listens on
pub fn unreachable_descriptor() -> DatabaseDescriptor {
    DatabaseDescriptor::new("127.0.0.1", 1, "postgres", "postgres", "test_ecommerce")
}

/// Wraps a connector and counts connection attempts
pub struct CountingConnector<C> {
    inner: C,
    attempts: AtomicU32,
}

impl<C> CountingConnector<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: Connector> Connector for CountingConnector<C> {
    async fn connect(
        &self,
        descriptor: &DatabaseDescriptor,
        database: &str,
    ) -> Result<Box<dyn AdminSession>, sqlx::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.connect(descriptor, database).await
    }
}
