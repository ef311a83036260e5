//! Prometheus metrics for dgwatch
//!
//! Exposed by the HTTP server at `/metrics`.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry,
};
use std::sync::OnceLock;
use tracing::warn;

use crate::health::{InstanceSide, SystemStatus};

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// dgwatch metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Sweep metrics
    /// Fleet sweeps completed
    pub sweeps_total: IntCounter,
    /// Fleet sweep latency (in seconds)
    pub sweep_duration_seconds: Histogram,

    // Probe metrics
    /// Probe stage failures by stage
    pub probe_failures_total: IntCounterVec,
    /// Last measured Data Guard lag
    pub dataguard_lag_seconds: IntGaugeVec,
    /// Last measured business session count on production
    pub active_connections: IntGaugeVec,

    // HTTP metrics
    /// Requests served by path
    pub http_requests_total: IntCounterVec,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        let sweeps_total = IntCounter::new(
            "dgwatch_sweeps_total",
            "Total number of fleet status sweeps",
        )
        .expect("valid metric definition");

        let sweep_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "dgwatch_sweep_duration_seconds",
                "Fleet sweep latency in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 7.5, 10.0, 15.0, 30.0]),
        )
        .expect("valid metric definition");

        let probe_failures_total = IntCounterVec::new(
            Opts::new(
                "dgwatch_probe_failures_total",
                "Total number of failed probe stages",
            ),
            &["stage"], // ping, port, connect, info, lag, connections
        )
        .expect("valid metric definition");

        let dataguard_lag_seconds = IntGaugeVec::new(
            Opts::new(
                "dgwatch_dataguard_lag_seconds",
                "Transport plus apply lag reported by the instance",
            ),
            &["database", "side"],
        )
        .expect("valid metric definition");

        let active_connections = IntGaugeVec::new(
            Opts::new(
                "dgwatch_active_connections",
                "Active non-background sessions on the production instance",
            ),
            &["database"],
        )
        .expect("valid metric definition");

        let http_requests_total = IntCounterVec::new(
            Opts::new("dgwatch_http_requests_total", "Total HTTP requests served"),
            &["path"],
        )
        .expect("valid metric definition");

        // Register all metrics
        registry
            .register(Box::new(sweeps_total.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(sweep_duration_seconds.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(probe_failures_total.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(dataguard_lag_seconds.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(active_connections.clone()))
            .expect("metric registered once");
        registry
            .register(Box::new(http_requests_total.clone()))
            .expect("metric registered once");

        Self {
            registry,
            sweeps_total,
            sweep_duration_seconds,
            probe_failures_total,
            dataguard_lag_seconds,
            active_connections,
            http_requests_total,
        }
    }

    /// Record a completed sweep
    pub fn record_sweep(&self, duration_secs: f64) {
        self.sweeps_total.inc();
        self.sweep_duration_seconds.observe(duration_secs);
    }

    /// Record a failed probe stage
    pub fn record_probe_failure(&self, stage: &str) {
        self.probe_failures_total.with_label_values(&[stage]).inc();
    }

    /// Replace the lag and session gauges with the measurements of a sweep.
    ///
    /// Series for databases that are gone from the fleet, or whose value is
    /// unknown in this sweep, are dropped instead of keeping a stale value.
    pub fn publish_measurements(&self, statuses: &[SystemStatus]) {
        self.dataguard_lag_seconds.reset();
        self.active_connections.reset();

        for status in statuses {
            let sides = [
                (InstanceSide::Production, status.prod_lag_seconds),
                (InstanceSide::DisasterRecovery, status.dr_lag_seconds),
            ];
            for (side, lag) in sides {
                if let Some(seconds) = lag {
                    self.dataguard_lag_seconds
                        .with_label_values(&[status.name.as_str(), side.as_str()])
                        .set(seconds);
                }
            }
            if let Some(count) = status.connections {
                self.active_connections
                    .with_label_values(&[status.name.as_str()])
                    .set(count);
            }
        }
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, path: &str) {
        self.http_requests_total.with_label_values(&[path]).inc();
    }

    /// Get metrics as Prometheus text format
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
