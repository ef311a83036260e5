//! dgwatch: Oracle Data Guard health monitor
//!
//! Probes every configured database through its load balancer, production
//! and disaster recovery addresses and serves the aggregated status over
//! HTTP.

pub mod config;
pub mod health;
pub mod metrics;
#[cfg(feature = "mock")]
pub mod mock;
pub mod oracle;
pub mod probe;
pub mod server;
