use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::DatabaseTarget;
use crate::metrics::metrics;

use super::checker::HealthChecker;
use super::status::SystemStatus;

impl HealthChecker {
    /// Evaluate every target concurrently.
    ///
    /// The result has one entry per target, in the same order, regardless
    /// of which evaluation finishes first. Each task's result lands in the
    /// slot for its index.
    pub async fn check_fleet(&self, targets: &[DatabaseTarget]) -> Vec<SystemStatus> {
        let started = Instant::now();
        let mut slots: Vec<Option<SystemStatus>> = vec![None; targets.len()];

        let mut tasks = JoinSet::new();
        for (idx, target) in targets.iter().enumerate() {
            let checker = self.clone();
            let target = Arc::new(target.clone());
            tasks.spawn(async move { (idx, checker.check_system(target).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, status)) => slots[idx] = Some(status),
                Err(e) => error!(error = %e, "System check task failed"),
            }
        }

        let statuses: Vec<SystemStatus> = slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| slot.unwrap_or_else(|| SystemStatus::unchecked(target)))
            .collect();

        let elapsed = started.elapsed();
        metrics().record_sweep(elapsed.as_secs_f64());
        metrics().publish_measurements(&statuses);
        info!(
            databases = statuses.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Fleet sweep complete"
        );
        statuses
    }
}
