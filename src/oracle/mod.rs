//! Oracle database probing
//!
//! This module provides:
//! - Connect endpoint assembly from a database target
//! - The `Connector`/`DbSession` seam used by the health evaluators
//! - An `oracle`-crate backed implementation of that seam
//! - Data Guard lag parsing

mod client;
mod lag;

pub use client::{OracleConnector, OracleSession};
pub use lag::{compute_lag, parse_lag, LagParseError, LagStat, APPLY_LAG, TRANSPORT_LAG};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::DatabaseTarget;
use crate::probe::join_host_port;

/// Open mode reported by a writable (primary) database
pub const OPEN_MODE_READ_WRITE: &str = "READ WRITE";

/// Errors from the database probe client
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Failed to query V$DATABASE: {0}")]
    InfoFetch(String),
    #[error("Failed to query V$DATAGUARD_STATS: {0}")]
    LagFetch(String),
    #[error("Failed to parse lag: {0}")]
    LagFormat(#[from] LagParseError),
    #[error("Failed to query business connection count: {0}")]
    ConnectionCount(String),
    #[error("Session already closed")]
    Closed,
    #[error("Probe task failed: {0}")]
    Task(String),
}

/// Everything needed to reach one instance
#[derive(Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub username: String,
    pub password: String,
    pub connect_timeout: Duration,
}

impl Endpoint {
    /// Build the endpoint for `host` using the target's port, service and
    /// credentials
    pub fn for_host(target: &DatabaseTarget, host: &str, connect_timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port: target.port,
            service_name: target.service_name.clone(),
            username: target.username.clone(),
            password: target.password.clone(),
            connect_timeout,
        }
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        join_host_port(&self.host, self.port)
    }

    /// Easy Connect string, e.g. `//10.0.0.1:1521/orcl?connect_timeout=5`
    pub fn connect_string(&self) -> String {
        let mut s = format!("//{}/{}", self.addr(), self.service_name);
        let secs = self.connect_timeout.as_secs();
        if secs > 0 {
            s.push_str(&format!("?connect_timeout={}", secs));
        }
        s
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("addr", &self.addr())
            .field("service_name", &self.service_name)
            .field("username", &self.username)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Role and open mode from `V$DATABASE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub role: String,
    pub open_mode: String,
}

/// Opens short-lived probe sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect and verify the session with a ping
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn DbSession>, DbError>;
}

/// An open probe session.
///
/// Callers finish with `close`; a session dropped without `close` still
/// releases its connection.
#[async_trait]
pub trait DbSession: Send {
    async fn database_info(&mut self) -> Result<DatabaseInfo, DbError>;

    /// Transport plus apply lag in seconds, `None` when the database
    /// reports no Data Guard lag metrics
    async fn replication_lag(&mut self) -> Result<Option<i64>, DbError>;

    /// Active, non-background sessions
    async fn active_connection_count(&mut self) -> Result<i64, DbError>;

    async fn close(self: Box<Self>);
}
