//! `oracle`-crate backed probe sessions
//!
//! The driver is blocking, so every call runs on the blocking pool. The
//! connection moves into the blocking closure and back out again, which
//! keeps the session `Send` without a lock.

use async_trait::async_trait;
use oracle::Connection;
use tracing::{debug, warn};

use super::lag::{compute_lag, LagStat};
use super::{Connector, DatabaseInfo, DbError, DbSession, Endpoint};

const DATABASE_INFO_SQL: &str = "SELECT DATABASE_ROLE, OPEN_MODE FROM V$DATABASE";

const DATAGUARD_LAG_SQL: &str = "SELECT NAME, VALUE FROM V$DATAGUARD_STATS \
     WHERE NAME IN ('apply lag', 'transport lag')";

const ACTIVE_SESSIONS_SQL: &str =
    "SELECT COUNT(*) FROM V$SESSION WHERE TYPE != 'BACKGROUND' AND STATUS = 'ACTIVE'";

/// Opens sessions with the Oracle client libraries
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleConnector;

#[async_trait]
impl Connector for OracleConnector {
    async fn open(&self, endpoint: &Endpoint) -> Result<Box<dyn DbSession>, DbError> {
        let session = OracleSession::connect(endpoint).await?;
        Ok(Box::new(session))
    }
}

/// A short-lived probe connection
pub struct OracleSession {
    conn: Option<Connection>,
    addr: String,
}

impl OracleSession {
    /// Connect, set the call timeout and ping
    pub async fn connect(endpoint: &Endpoint) -> Result<Self, DbError> {
        let addr = endpoint.addr();
        let username = endpoint.username.clone();
        let password = endpoint.password.clone();
        let connect_string = endpoint.connect_string();
        let call_timeout = endpoint.connect_timeout;

        debug!(addr = %addr, "Connecting to database");

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::connect(&username, &password, &connect_string)
                .map_err(|e| DbError::Connection(e.to_string()))?;
            if !call_timeout.is_zero() {
                conn.set_call_timeout(Some(call_timeout))
                    .map_err(|e| DbError::Connection(e.to_string()))?;
            }
            conn.ping()
                .map_err(|e| DbError::Connection(format!("ping failed: {}", e)))?;
            Ok::<_, DbError>(conn)
        })
        .await
        .map_err(|e| DbError::Task(e.to_string()))??;

        Ok(Self {
            conn: Some(conn),
            addr,
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&mut self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.take().ok_or(DbError::Closed)?;
        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&conn);
            (conn, result)
        })
        .await
        .map_err(|e| DbError::Task(e.to_string()))?;
        self.conn = Some(conn);
        result
    }
}

#[async_trait]
impl DbSession for OracleSession {
    async fn database_info(&mut self) -> Result<DatabaseInfo, DbError> {
        self.with_conn(|conn| {
            let (role, open_mode) = conn
                .query_row_as::<(String, String)>(DATABASE_INFO_SQL, &[])
                .map_err(|e| DbError::InfoFetch(e.to_string()))?;
            Ok(DatabaseInfo { role, open_mode })
        })
        .await
    }

    async fn replication_lag(&mut self) -> Result<Option<i64>, DbError> {
        self.with_conn(|conn| {
            let rows = conn
                .query(DATAGUARD_LAG_SQL, &[])
                .map_err(|e| DbError::LagFetch(e.to_string()))?;

            let mut stats = Vec::new();
            for row in rows {
                let row = row.map_err(|e| DbError::LagFetch(e.to_string()))?;
                let name: Option<String> = row
                    .get(0)
                    .map_err(|e| DbError::LagFetch(e.to_string()))?;
                let value: Option<String> = row
                    .get(1)
                    .map_err(|e| DbError::LagFetch(e.to_string()))?;
                if value.is_none() {
                    debug!(name = ?name, "Lag value is NULL, treating as zero");
                }
                stats.push(LagStat { name, value });
            }
            compute_lag(stats)
        })
        .await
    }

    async fn active_connection_count(&mut self) -> Result<i64, DbError> {
        self.with_conn(|conn| {
            conn.query_row_as::<i64>(ACTIVE_SESSIONS_SQL, &[])
                .map_err(|e| DbError::ConnectionCount(e.to_string()))
        })
        .await
    }

    async fn close(self: Box<Self>) {
        let mut session = self;
        let Some(conn) = session.conn.take() else {
            return;
        };
        let addr = session.addr.clone();
        let result = tokio::task::spawn_blocking(move || conn.close()).await;
        match result {
            Ok(Ok(())) => debug!(addr = %addr, "Database session closed"),
            Ok(Err(e)) => warn!(addr = %addr, error = %e, "Failed to close database session"),
            Err(e) => warn!(addr = %addr, error = %e, "Close task failed"),
        }
    }
}

impl Drop for OracleSession {
    fn drop(&mut self) {
        if self.conn.is_some() {
            debug!(addr = %self.addr, "Database session dropped without close");
        }
    }
}

