//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_request_duration_seconds` (histogram): latency by method, status
//! - `http_request_latency_unavailable_total` (counter): completions with no start timing
//! - `hook_failures_total` (counter): swallowed hook failures by hook, phase
//! - `heartbeat_ticks_total` (counter): liveness ticks
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request_latency(method: &str, status: &str, elapsed: Duration) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_latency_unavailable() {
    counter!("http_request_latency_unavailable_total").increment(1);
}

pub fn record_hook_failure(hook: &'static str, phase: &'static str) {
    counter!("hook_failures_total", "hook" => hook, "phase" => phase).increment(1);
}

pub fn record_heartbeat() {
    counter!("heartbeat_ticks_total").increment(1);
}
