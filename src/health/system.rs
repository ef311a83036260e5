use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::DatabaseTarget;
use crate::metrics::metrics;
use crate::oracle::Endpoint;

use super::checker::HealthChecker;
use super::status::{InstanceSide, InstanceStatus, LoadBalancerStatus, SystemStatus};

impl HealthChecker {
    /// Ping, port and connect check through the load balancer address
    pub async fn check_load_balancer(&self, target: &DatabaseTarget) -> LoadBalancerStatus {
        let mut status = LoadBalancerStatus::default();
        let host = target.lb_ip.as_str();

        if let Err(e) = self.reachability.ping(host, self.settings.ping_timeout).await {
            warn!(database = %target.name, addr = %host, error = %e, "Load balancer ping failed");
            metrics().record_probe_failure("ping");
            return status;
        }
        status.alive = true;

        if let Err(e) = self
            .reachability
            .check_port(host, target.port, self.settings.port_timeout)
            .await
        {
            warn!(database = %target.name, addr = %host, port = target.port, error = %e, "Load balancer port check failed");
            metrics().record_probe_failure("port");
            return status;
        }
        status.port_open = true;

        let endpoint = Endpoint::for_host(target, host, self.settings.connect_timeout);
        match self.connector.open(&endpoint).await {
            Ok(session) => {
                session.close().await;
                status.db_connect = true;
            }
            Err(e) => {
                warn!(database = %target.name, addr = %endpoint.addr(), error = %e, "Load balancer database connect failed");
                metrics().record_probe_failure("connect");
            }
        }

        status
    }

    /// Evaluate the load balancer, production and DR sides of one database
    /// concurrently and merge them once all three are done.
    pub async fn check_system(&self, target: Arc<DatabaseTarget>) -> SystemStatus {
        let lb = tokio::spawn({
            let checker = self.clone();
            let target = target.clone();
            async move { checker.check_load_balancer(&target).await }
        });
        let prod = tokio::spawn({
            let checker = self.clone();
            let target = target.clone();
            async move {
                checker
                    .check_instance(&target, &target.prod_ip, InstanceSide::Production)
                    .await
            }
        });
        let dr = tokio::spawn({
            let checker = self.clone();
            let target = target.clone();
            async move {
                checker
                    .check_instance(&target, &target.dr_ip, InstanceSide::DisasterRecovery)
                    .await
            }
        });

        let (lb, prod, dr) = tokio::join!(lb, prod, dr);

        let lb = lb.unwrap_or_else(|e| {
            error!(database = %target.name, error = %e, "Load balancer check task failed");
            LoadBalancerStatus::default()
        });
        let prod = prod.unwrap_or_else(|e| {
            error!(database = %target.name, error = %e, "Production check task failed");
            InstanceStatus::default()
        });
        let dr = dr.unwrap_or_else(|e| {
            error!(database = %target.name, error = %e, "Disaster recovery check task failed");
            InstanceStatus::default()
        });

        debug!(
            database = %target.name,
            production = %prod.current_state,
            disaster_recovery = %dr.current_state,
            "System check complete"
        );
        SystemStatus::merge(&target, lb, prod, dr)
    }
}
