//! Test infrastructure for the gate
//!
//! [`ScriptedConnector`] stands in for a PostgreSQL server: it refuses a
//! configurable number of connections, keeps an in-memory catalog, and
//! records every attempt so tests can assert on attempt counts.

use crate::db::{AdminSession, Connector, CreateOutcome, DatabaseDescriptor};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;

#[derive(Debug, Default)]
struct ServerState {
    attempts: u32,
    connected: Vec<String>,
    open_sessions: usize,
    create_calls: u32,
    close_calls: u32,
    databases: HashSet<String>,
}

/// In-memory connector with scripted availability
#[derive(Debug, Clone)]
pub struct ScriptedConnector {
    /// Attempt number (1-based) from which connections succeed; `None` never
    reachable_from: Option<u32>,
    racing_creator: bool,
    failing_catalog: bool,
    failing_create: bool,
    failing_close: bool,
    state: Arc<Mutex<ServerState>>,
}

impl ScriptedConnector {
    fn with_reachability(reachable_from: Option<u32>) -> Self {
        Self {
            reachable_from,
            racing_creator: false,
            failing_catalog: false,
            failing_create: false,
            failing_close: false,
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    /// Server that accepts every connection
    pub fn reachable() -> Self {
        Self::with_reachability(Some(1))
    }

    /// Server that refuses the first `k - 1` connections
    pub fn reachable_after(k: u32) -> Self {
        Self::with_reachability(Some(k.max(1)))
    }

    /// Server that refuses every connection
    pub fn unreachable() -> Self {
        Self::with_reachability(None)
    }

    /// Seed the catalog with an existing database
    pub fn with_database(self, name: &str) -> Self {
        self.state.lock().databases.insert(name.to_string());
        self
    }

    /// Another client creates the database between check and create
    pub fn racing_creator(mut self) -> Self {
        self.racing_creator = true;
        self
    }

    /// Catalog queries fail
    pub fn failing_catalog(mut self) -> Self {
        self.failing_catalog = true;
        self
    }

    /// `CREATE DATABASE` fails
    pub fn failing_create(mut self) -> Self {
        self.failing_create = true;
        self
    }

    /// Closing a session reports an error
    pub fn failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    /// Total connection attempts so far
    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    /// Databases named in successful connections, in order
    pub fn connected_databases(&self) -> Vec<String> {
        self.state.lock().connected.clone()
    }

    /// Sessions opened but not yet closed or dropped
    pub fn open_sessions(&self) -> usize {
        self.state.lock().open_sessions
    }

    /// Number of create commands issued
    pub fn create_calls(&self) -> u32 {
        self.state.lock().create_calls
    }

    /// Number of explicit session closes
    pub fn close_calls(&self) -> u32 {
        self.state.lock().close_calls
    }

    /// Whether the catalog lists `name`
    pub fn has_database(&self, name: &str) -> bool {
        self.state.lock().databases.contains(name)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        _descriptor: &DatabaseDescriptor,
        database: &str,
    ) -> Result<Box<dyn AdminSession>, sqlx::Error> {
        let mut state = self.state.lock();
        state.attempts += 1;

        let accepted = matches!(self.reachable_from, Some(from) if state.attempts >= from);
        if !accepted {
            return Err(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        state.connected.push(database.to_string());
        state.open_sessions += 1;
        Ok(Box::new(ScriptedSession {
            connector: self.clone(),
        }))
    }
}

struct ScriptedSession {
    connector: ScriptedConnector,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        let mut state = self.connector.state.lock();
        state.open_sessions = state.open_sessions.saturating_sub(1);
    }
}

#[async_trait]
impl AdminSession for ScriptedSession {
    async fn database_exists(&mut self, name: &str) -> Result<bool, sqlx::Error> {
        if self.connector.failing_catalog {
            return Err(sqlx::Error::Protocol("catalog query failed".to_string()));
        }
        Ok(self.connector.state.lock().databases.contains(name))
    }

    async fn create_database(&mut self, name: &str) -> Result<CreateOutcome, sqlx::Error> {
        if self.connector.failing_create {
            return Err(sqlx::Error::Protocol(format!(
                "permission denied to create database \"{}\"",
                name
            )));
        }

        let mut state = self.connector.state.lock();
        state.create_calls += 1;
        if self.connector.racing_creator {
            state.databases.insert(name.to_string());
        }

        if state.databases.insert(name.to_string()) {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn close(self: Box<Self>) -> Result<(), sqlx::Error> {
        self.connector.state.lock().close_calls += 1;
        if self.connector.failing_close {
            return Err(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "connection reset while closing",
            )));
        }
        Ok(())
    }
}
