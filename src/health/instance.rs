//! Layered probe for a single instance
//!
//! Stages run in order and the first failure is terminal:
//! 1. ICMP reachability (`OFFLINE`)
//! 2. Listener port (`PORT_ERROR`)
//! 3. Database session (`DB_CONNECTION_ERROR`)
//! 4. Role/open mode from `V$DATABASE` (`INFO_FETCH_FAILED`)
//!
//! After stage 4 the state is the raw open mode. A writable production
//! instance then reports its business session count; any other non-empty
//! open mode reports Data Guard lag. Failures there leave the measurement
//! unknown without touching role or state.

use tracing::{debug, warn};

use crate::config::DatabaseTarget;
use crate::metrics::metrics;
use crate::oracle::{DbSession, Endpoint, OPEN_MODE_READ_WRITE};

use super::checker::HealthChecker;
use super::status::{
    InstanceSide, InstanceStatus, STATE_DB_CONNECTION_ERROR, STATE_INFO_FETCH_FAILED,
    STATE_OFFLINE, STATE_PORT_ERROR,
};

impl HealthChecker {
    /// Probe the instance at `host` for `target`. Never fails: every stage
    /// failure is logged and folded into the returned status.
    pub async fn check_instance(
        &self,
        target: &DatabaseTarget,
        host: &str,
        side: InstanceSide,
    ) -> InstanceStatus {
        let mut status = InstanceStatus::default();
        let database = target.name.as_str();

        if let Err(e) = self.reachability.ping(host, self.settings.ping_timeout).await {
            warn!(database = %database, side = side.as_str(), addr = %host, error = %e, "Ping failed");
            metrics().record_probe_failure("ping");
            status.current_state = STATE_OFFLINE.to_string();
            return status;
        }
        status.is_alive = true;

        if let Err(e) = self
            .reachability
            .check_port(host, target.port, self.settings.port_timeout)
            .await
        {
            warn!(database = %database, side = side.as_str(), addr = %host, port = target.port, error = %e, "Port check failed");
            metrics().record_probe_failure("port");
            status.current_state = STATE_PORT_ERROR.to_string();
            return status;
        }
        status.port_open = true;

        let endpoint = Endpoint::for_host(target, host, self.settings.connect_timeout);
        let mut session = match self.connector.open(&endpoint).await {
            Ok(session) => session,
            Err(e) => {
                warn!(database = %database, side = side.as_str(), addr = %endpoint.addr(), error = %e, "Could not connect to database");
                metrics().record_probe_failure("connect");
                status.current_state = STATE_DB_CONNECTION_ERROR.to_string();
                return status;
            }
        };
        status.db_connected = true;

        self.inspect(session.as_mut(), database, side, &mut status)
            .await;
        session.close().await;

        status
    }

    /// Stage 4 onwards, on an open session
    async fn inspect(
        &self,
        session: &mut dyn DbSession,
        database: &str,
        side: InstanceSide,
        status: &mut InstanceStatus,
    ) {
        let info = match session.database_info().await {
            Ok(info) => info,
            Err(e) => {
                warn!(database = %database, side = side.as_str(), error = %e, "Failed to get database info");
                metrics().record_probe_failure("info");
                status.current_state = STATE_INFO_FETCH_FAILED.to_string();
                return;
            }
        };

        debug!(
            database = %database,
            side = side.as_str(),
            role = %info.role,
            open_mode = %info.open_mode,
            "Database info fetched"
        );
        if !info.role.is_empty() {
            status.role = info.role;
        }
        status.current_state = info.open_mode;

        if status.current_state == OPEN_MODE_READ_WRITE {
            if !side.reports_connections() {
                return;
            }
            match session.active_connection_count().await {
                Ok(count) => status.active_connections = Some(count),
                Err(e) => {
                    warn!(database = %database, side = side.as_str(), error = %e, "Failed to get business connection count");
                    metrics().record_probe_failure("connections");
                }
            }
        } else if !status.current_state.is_empty() {
            match session.replication_lag().await {
                Ok(lag) => status.replication_lag_seconds = lag,
                Err(e) => {
                    warn!(database = %database, side = side.as_str(), error = %e, "Failed to get Data Guard lag");
                    metrics().record_probe_failure("lag");
                }
            }
        }
    }
}
