//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    record_decision, record_fill, record_lag_latency, record_skip, set_equity, set_open_positions,
};

use crate::config::TelemetryConfig;

/// Initialize logging and the metrics exporter
///
/// A failed exporter bind is logged and ignored; the engine trades fine
/// without a scrape endpoint.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level)?;

    let builder = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port));
    if let Err(e) = builder.install() {
        tracing::warn!(error = %e, port = config.metrics_port, "Metrics exporter not started");
    }

    Ok(())
}
