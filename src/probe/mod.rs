//! Network reachability probes
//!
//! This module provides:
//! - ICMP liveness via the system `ping` command, hard-bounded by a timeout
//! - TCP connect checks against a listener port
//! - The `Reachability` seam the health evaluators probe through

mod net;

pub use net::{
    check_tcp_port, decode_output, join_host_port, ping_host, PortError, ReachabilityError,
    DEFAULT_PING_TIMEOUT, DEFAULT_PORT_TIMEOUT,
};

use std::time::Duration;

use async_trait::async_trait;

/// Network-level liveness checks for a single address.
///
/// `Ok(())` means alive/open. Every negative outcome is an `Err` whose
/// variant tells tooling failures apart from a genuine "unreachable".
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn ping(&self, host: &str, timeout: Duration) -> Result<(), ReachabilityError>;

    async fn check_port(&self, host: &str, port: u16, timeout: Duration)
        -> Result<(), PortError>;
}

/// Probes the real network using `ping` and TCP connects
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemReachability;

#[async_trait]
impl Reachability for SystemReachability {
    async fn ping(&self, host: &str, timeout: Duration) -> Result<(), ReachabilityError> {
        ping_host(host, timeout).await
    }

    async fn check_port(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), PortError> {
        check_tcp_port(host, port, timeout).await
    }
}
