//! Health evaluation for Data Guard pairs
//!
//! This module provides:
//! - The layered probe for a single production or DR instance
//! - Concurrent load balancer / production / DR evaluation per database
//! - Concurrent, order-preserving evaluation of the whole fleet

mod checker;
mod fleet;
mod instance;
mod status;
mod system;

pub use checker::{HealthChecker, ProbeSettings};
pub use status::{
    InstanceSide, InstanceStatus, LoadBalancerStatus, SystemStatus, ROLE_UNKNOWN,
    STATE_CHECKING, STATE_DB_CONNECTION_ERROR, STATE_INFO_FETCH_FAILED, STATE_OFFLINE,
    STATE_PORT_ERROR, UNKNOWN_VALUE,
};
