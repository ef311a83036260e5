//! Integration test entry point
//!
//! Most tests drive the evaluators through scripted fakes of the network and
//! database seams and need nothing external. Tests against a real Oracle
//! instance are skipped unless enabled.
//!
//! Run with: DGWATCH_RUN_INTEGRATION_TESTS=1 cargo test --test integration
//!
//! Environment variables:
//! - DGWATCH_RUN_INTEGRATION_TESTS: Set to "1" to enable live database tests
//! - DGWATCH_TEST_ORACLE_HOST: Oracle host (default: 127.0.0.1)
//! - DGWATCH_TEST_ORACLE_PORT: Listener port (default: 1521)
//! - DGWATCH_TEST_ORACLE_SERVICE: Service name (default: FREEPDB1)
//! - DGWATCH_TEST_ORACLE_USER: User (default: system)
//! - DGWATCH_TEST_ORACLE_PASS: Password (default: oracle)

mod fleet;
mod server;

use std::collections::{HashMap, HashSet};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use dgwatch::config::DatabaseTarget;
use dgwatch::health::{HealthChecker, ProbeSettings};
use dgwatch::oracle::{Connector, DatabaseInfo, DbError, DbSession, Endpoint};
use dgwatch::probe::{PortError, ReachabilityError, Reachability};

/// Check if live database tests should run
pub fn should_run_integration_tests() -> bool {
    env::var("DGWATCH_RUN_INTEGRATION_TESTS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

/// Skip test if live database tests are not enabled
#[macro_export]
macro_rules! skip_if_not_enabled {
    () => {
        if !crate::should_run_integration_tests() {
            eprintln!("Skipping integration test (set DGWATCH_RUN_INTEGRATION_TESTS=1 to run)");
            return;
        }
    };
}

/// Live Oracle connection settings from the environment
#[derive(Debug, Clone)]
pub struct OracleTestConfig {
    pub host: String,
    pub port: u16,
    pub service_name: String,
    pub user: String,
    pub password: String,
}

pub fn get_oracle_config() -> OracleTestConfig {
    OracleTestConfig {
        host: env::var("DGWATCH_TEST_ORACLE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: env::var("DGWATCH_TEST_ORACLE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(1521),
        service_name: env::var("DGWATCH_TEST_ORACLE_SERVICE")
            .unwrap_or_else(|_| "FREEPDB1".to_string()),
        user: env::var("DGWATCH_TEST_ORACLE_USER").unwrap_or_else(|_| "system".to_string()),
        password: env::var("DGWATCH_TEST_ORACLE_PASS").unwrap_or_else(|_| "oracle".to_string()),
    }
}

impl OracleTestConfig {
    /// Target with all three addresses pointing at the test instance
    pub fn target(&self) -> DatabaseTarget {
        DatabaseTarget {
            name: "LIVE".to_string(),
            lb_ip: self.host.clone(),
            prod_ip: self.host.clone(),
            dr_ip: self.host.clone(),
            port: self.port,
            service_name: self.service_name.clone(),
            username: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

// ============================================================================
// Fakes
// ============================================================================

/// Timeouts used by fake-driven checkers
pub fn test_settings() -> ProbeSettings {
    ProbeSettings {
        ping_timeout: Duration::from_secs(3),
        port_timeout: Duration::from_secs(3),
        connect_timeout: Duration::from_secs(5),
    }
}

/// Target whose three addresses are `<prefix>-lb`, `<prefix>-prod`, `<prefix>-dr`
pub fn target(name: &str) -> DatabaseTarget {
    DatabaseTarget {
        name: name.to_string(),
        lb_ip: format!("{}-lb", name),
        prod_ip: format!("{}-prod", name),
        dr_ip: format!("{}-dr", name),
        port: 1521,
        service_name: name.to_lowercase(),
        username: "monitor".to_string(),
        password: "secret".to_string(),
    }
}

/// Scripted network. Every host answers ping and has an open port unless
/// listed otherwise.
#[derive(Default)]
pub struct FakeNetwork {
    down: HashSet<String>,
    closed: HashSet<String>,
    /// Hosts whose ping never answers; the fake waits out the timeout
    hung: HashSet<String>,
    /// Latency added to every ping and port check
    latency: Duration,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn down(mut self, host: &str) -> Self {
        self.down.insert(host.to_string());
        self
    }

    pub fn closed(mut self, host: &str) -> Self {
        self.closed.insert(host.to_string());
        self
    }

    pub fn hung(mut self, host: &str) -> Self {
        self.hung.insert(host.to_string());
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Reachability for FakeNetwork {
    async fn ping(&self, host: &str, timeout: Duration) -> Result<(), ReachabilityError> {
        if self.hung.contains(host) {
            tokio::time::sleep(timeout).await;
            return Err(ReachabilityError::Timeout {
                host: host.to_string(),
                timeout,
            });
        }
        tokio::time::sleep(self.latency).await;
        if self.down.contains(host) {
            return Err(ReachabilityError::Unreachable {
                host: host.to_string(),
                output: "100% packet loss".to_string(),
            });
        }
        Ok(())
    }

    async fn check_port(&self, host: &str, port: u16, timeout: Duration) -> Result<(), PortError> {
        tokio::time::sleep(self.latency).await;
        if self.closed.contains(host) {
            return Err(PortError::Timeout {
                addr: format!("{}:{}", host, port),
                timeout,
            });
        }
        Ok(())
    }
}

/// Scripted answers of one fake database
#[derive(Debug, Clone)]
pub struct FakeDb {
    pub info: Result<(String, String), String>,
    pub lag: Result<Option<i64>, String>,
    pub connections: Result<i64, String>,
}

impl FakeDb {
    pub fn primary(connections: i64) -> Self {
        Self {
            info: Ok(("PRIMARY".to_string(), "READ WRITE".to_string())),
            lag: Ok(None),
            connections: Ok(connections),
        }
    }

    pub fn standby(lag: i64) -> Self {
        Self {
            info: Ok(("PHYSICAL STANDBY".to_string(), "READ ONLY WITH APPLY".to_string())),
            lag: Ok(Some(lag)),
            connections: Ok(0),
        }
    }
}

/// Per-call bookkeeping shared between the connector and its sessions
#[derive(Debug, Default)]
pub struct Calls {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub info: AtomicUsize,
    pub lag: AtomicUsize,
    pub connections: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Scripted connector. Hosts without a scripted database refuse the
/// connection.
#[derive(Default)]
pub struct FakeConnector {
    dbs: HashMap<String, FakeDb>,
    latency: Duration,
    pub calls: Arc<Calls>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn db(mut self, host: &str, db: FakeDb) -> Self {
        self.dbs.insert(host.to_string(), db);
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn DbSession>, DbError> {
        tokio::time::sleep(self.latency).await;
        match self.dbs.get(&endpoint.host) {
            Some(db) => {
                self.calls.opened.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeSession {
                    db: db.clone(),
                    latency: self.latency,
                    calls: self.calls.clone(),
                }))
            }
            None => Err(DbError::Connection(format!(
                "ORA-12541: no listener at {}",
                endpoint.addr()
            ))),
        }
    }
}

pub struct FakeSession {
    db: FakeDb,
    latency: Duration,
    calls: Arc<Calls>,
}

#[async_trait]
impl DbSession for FakeSession {
    async fn database_info(&mut self) -> Result<DatabaseInfo, DbError> {
        self.calls.info.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.db
            .info
            .clone()
            .map(|(role, open_mode)| DatabaseInfo { role, open_mode })
            .map_err(DbError::InfoFetch)
    }

    async fn replication_lag(&mut self) -> Result<Option<i64>, DbError> {
        self.calls.lag.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.db.lag.clone().map_err(DbError::LagFetch)
    }

    async fn active_connection_count(&mut self) -> Result<i64, DbError> {
        self.calls.connections.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.db.connections.clone().map_err(DbError::ConnectionCount)
    }

    async fn close(self: Box<Self>) {
        self.calls.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Checker over the given fakes, keeping a handle on the call counters
pub fn checker(network: FakeNetwork, connector: FakeConnector) -> (HealthChecker, Arc<Calls>) {
    let calls = connector.calls.clone();
    let checker = HealthChecker::new(Arc::new(network), Arc::new(connector), test_settings());
    (checker, calls)
}

/// Connector where every address of `name` is a healthy primary/standby pair
pub fn healthy_pair(connector: FakeConnector, name: &str) -> FakeConnector {
    connector
        .db(&format!("{}-lb", name), FakeDb::primary(10))
        .db(&format!("{}-prod", name), FakeDb::primary(10))
        .db(&format!("{}-dr", name), FakeDb::standby(4))
}
