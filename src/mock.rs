//! Synthetic fleet data for dashboard development

use rand::Rng;

use crate::config::DatabaseTarget;
use crate::health::{
    InstanceStatus, LoadBalancerStatus, SystemStatus, STATE_DB_CONNECTION_ERROR, STATE_OFFLINE,
    STATE_PORT_ERROR,
};

const DEGRADED_STATES: [&str; 3] = [STATE_OFFLINE, STATE_PORT_ERROR, STATE_DB_CONNECTION_ERROR];

/// `count` plausible statuses named `DB01`, `DB02`, ...
///
/// Every production side is a healthy primary. Roughly one DR side in ten
/// is degraded; the rest are standbys with a few seconds to minutes of lag.
pub fn mock_fleet(count: usize) -> Vec<SystemStatus> {
    let mut rng = rand::thread_rng();
    (1..=count).map(|n| mock_system(&mut rng, n)).collect()
}

fn mock_system<R: Rng>(rng: &mut R, n: usize) -> SystemStatus {
    let target = DatabaseTarget {
        name: format!("DB{:02}", n),
        lb_ip: format!("10.10.0.{}", n),
        prod_ip: format!("10.10.1.{}", n),
        dr_ip: format!("10.10.2.{}", n),
        port: 1521,
        service_name: format!("db{:02}", n),
        username: "monitor".to_string(),
        password: String::new(),
    };

    let lb = LoadBalancerStatus {
        alive: true,
        port_open: true,
        db_connect: true,
    };

    let prod = InstanceStatus {
        is_alive: true,
        port_open: true,
        db_connected: true,
        current_state: "READ WRITE".to_string(),
        role: "PRIMARY".to_string(),
        replication_lag_seconds: None,
        active_connections: Some(rng.gen_range(5..300)),
    };

    let dr = if rng.gen_bool(0.1) {
        let state = DEGRADED_STATES[rng.gen_range(0..DEGRADED_STATES.len())];
        degraded(state)
    } else {
        InstanceStatus {
            is_alive: true,
            port_open: true,
            db_connected: true,
            current_state: "MOUNTED".to_string(),
            role: "PHYSICAL STANDBY".to_string(),
            replication_lag_seconds: Some(rng.gen_range(0..600)),
            active_connections: None,
        }
    };

    SystemStatus::merge(&target, lb, prod, dr)
}

fn degraded(state: &str) -> InstanceStatus {
    InstanceStatus {
        is_alive: state != STATE_OFFLINE,
        port_open: state == STATE_DB_CONNECTION_ERROR,
        current_state: state.to_string(),
        ..InstanceStatus::default()
    }
}
