//! Status records produced by a sweep
//!
//! Role and state strings are passed through exactly as the database (or
//! the probe stage) reported them; any translation for display belongs to
//! the dashboard.

use serde::{Serialize, Serializer};

use crate::config::DatabaseTarget;

/// Wire value for a measurement that was not taken
pub const UNKNOWN_VALUE: i64 = -1;

/// Role before a successful `V$DATABASE` query
pub const ROLE_UNKNOWN: &str = "UNKNOWN";
/// State before the evaluator reached a terminal stage
pub const STATE_CHECKING: &str = "CHECKING";

pub const STATE_OFFLINE: &str = "OFFLINE";
pub const STATE_PORT_ERROR: &str = "PORT_ERROR";
pub const STATE_DB_CONNECTION_ERROR: &str = "DB_CONNECTION_ERROR";
pub const STATE_INFO_FETCH_FAILED: &str = "INFO_FETCH_FAILED";

/// Which side of the Data Guard pair an instance is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSide {
    Production,
    DisasterRecovery,
}

impl InstanceSide {
    /// Label used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceSide::Production => "production",
            InstanceSide::DisasterRecovery => "disaster_recovery",
        }
    }

    /// Only the production side reports a business connection count
    pub fn reports_connections(&self) -> bool {
        matches!(self, InstanceSide::Production)
    }
}

/// Outcome of the layered probe for one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    pub is_alive: bool,
    pub port_open: bool,
    pub db_connected: bool,
    /// Terminal stage name or the raw open mode
    pub current_state: String,
    /// Raw `DATABASE_ROLE`, or `UNKNOWN`
    pub role: String,
    pub replication_lag_seconds: Option<i64>,
    pub active_connections: Option<i64>,
}

impl Default for InstanceStatus {
    fn default() -> Self {
        Self {
            is_alive: false,
            port_open: false,
            db_connected: false,
            current_state: STATE_CHECKING.to_string(),
            role: ROLE_UNKNOWN.to_string(),
            replication_lag_seconds: None,
            active_connections: None,
        }
    }
}

/// Load balancer liveness triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadBalancerStatus {
    pub alive: bool,
    pub port_open: bool,
    pub db_connect: bool,
}

/// Aggregated status of one configured database, in the dashboard's
/// wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStatus {
    pub name: String,

    #[serde(rename = "load_balancer_ip")]
    pub lb_ip: String,
    #[serde(rename = "load_balancer_alive")]
    pub lb_alive: bool,
    #[serde(rename = "load_balancer_port_1521")]
    pub lb_port_open: bool,
    #[serde(rename = "load_balancer_db_connect")]
    pub lb_db_connect: bool,

    /// Business sessions on the production side
    #[serde(serialize_with = "serialize_unknown")]
    pub connections: Option<i64>,

    #[serde(rename = "production_ip")]
    pub prod_ip: String,
    #[serde(rename = "production_alive")]
    pub prod_alive: bool,
    #[serde(rename = "production_port_1521")]
    pub prod_port_open: bool,
    #[serde(rename = "production_db_connect")]
    pub prod_db_connect: bool,
    #[serde(rename = "production_status")]
    pub prod_status: String,
    #[serde(rename = "production_role")]
    pub prod_role: String,
    #[serde(rename = "production_dgdelay", serialize_with = "serialize_unknown")]
    pub prod_lag_seconds: Option<i64>,

    #[serde(rename = "disaster_ip")]
    pub dr_ip: String,
    #[serde(rename = "disaster_alive")]
    pub dr_alive: bool,
    #[serde(rename = "disaster_port_1521")]
    pub dr_port_open: bool,
    #[serde(rename = "disaster_db_connect")]
    pub dr_db_connect: bool,
    #[serde(rename = "disaster_status")]
    pub dr_status: String,
    #[serde(rename = "disaster_role")]
    pub dr_role: String,
    #[serde(rename = "disaster_dgdelay", serialize_with = "serialize_unknown")]
    pub dr_lag_seconds: Option<i64>,
}

impl SystemStatus {
    /// Record for a database whose probes have not produced a result
    pub fn unchecked(target: &DatabaseTarget) -> Self {
        Self::merge(
            target,
            LoadBalancerStatus::default(),
            InstanceStatus::default(),
            InstanceStatus::default(),
        )
    }

    /// Combine the three independent probe outcomes.
    ///
    /// `connections` comes from the production side only, and only when it
    /// measured one; the DR side never contributes.
    pub fn merge(
        target: &DatabaseTarget,
        lb: LoadBalancerStatus,
        prod: InstanceStatus,
        dr: InstanceStatus,
    ) -> Self {
        Self {
            name: target.name.clone(),
            lb_ip: target.lb_ip.clone(),
            lb_alive: lb.alive,
            lb_port_open: lb.port_open,
            lb_db_connect: lb.db_connect,
            connections: prod.active_connections,
            prod_ip: target.prod_ip.clone(),
            prod_alive: prod.is_alive,
            prod_port_open: prod.port_open,
            prod_db_connect: prod.db_connected,
            prod_status: prod.current_state,
            prod_role: prod.role,
            prod_lag_seconds: prod.replication_lag_seconds,
            dr_ip: target.dr_ip.clone(),
            dr_alive: dr.is_alive,
            dr_port_open: dr.port_open,
            dr_db_connect: dr.db_connected,
            dr_status: dr.current_state,
            dr_role: dr.role,
            dr_lag_seconds: dr.replication_lag_seconds,
        }
    }
}

fn serialize_unknown<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(value.unwrap_or(UNKNOWN_VALUE))
}
