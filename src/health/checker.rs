//! Health checker handle
//!
//! Bundles the probe seams and timeouts. The instance, system and fleet
//! evaluations are implemented on this type in their own modules.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ProbeConfig;
use crate::oracle::{Connector, OracleConnector};
use crate::probe::{Reachability, SystemReachability};

/// Timeouts applied to each probe stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    pub ping_timeout: Duration,
    pub port_timeout: Duration,
    /// Embedded in the connect string and used as the DB call timeout
    pub connect_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self::from(&ProbeConfig::default())
    }
}

impl From<&ProbeConfig> for ProbeSettings {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            ping_timeout: config.ping_timeout(),
            port_timeout: config.port_timeout(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

/// Runs the layered probes for instances, systems and the whole fleet.
///
/// Cheap to clone; every spawned evaluation task gets its own clone.
#[derive(Clone)]
pub struct HealthChecker {
    pub(super) reachability: Arc<dyn Reachability>,
    pub(super) connector: Arc<dyn Connector>,
    pub(super) settings: ProbeSettings,
}

impl HealthChecker {
    pub fn new(
        reachability: Arc<dyn Reachability>,
        connector: Arc<dyn Connector>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            reachability,
            connector,
            settings,
        }
    }

    /// Checker probing the real network and Oracle databases
    pub fn oracle(settings: ProbeSettings) -> Self {
        Self::new(
            Arc::new(SystemReachability),
            Arc::new(OracleConnector),
            settings,
        )
    }

    /// Same seams, different timeouts
    pub fn with_settings(&self, settings: ProbeSettings) -> Self {
        Self {
            reachability: self.reachability.clone(),
            connector: self.connector.clone(),
            settings,
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }
}
