//! Per-request latency measurement.
//!
//! The start timestamp lives in the request's own `RequestContext`; the
//! completion hook reads it back, so interleaved requests never share state.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::http::context::RequestContext;
use crate::http::hooks::{RequestHook, ResponseOutcome};
use crate::observability::metrics;

/// Monotonic start of one request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTiming {
    start: Instant,
}

impl RequestTiming {
    pub fn now() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// One completed (or aborted) request's latency.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyReport {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub outcome: ResponseOutcome,
    /// `None` when the start hook never ran for this request.
    pub elapsed: Option<Duration>,
}

impl LatencyReport {
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.elapsed.map(duration_ms)
    }

    /// The human-readable log line.
    pub fn message(&self) -> String {
        format_latency(&self.path, self.elapsed)
    }
}

fn duration_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1e3
}

/// `Latency for <path>: <ms> ms`, or `unavailable` without a start timing.
pub fn format_latency(path: &str, elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(elapsed) => format!("Latency for {}: {:.2} ms", path, duration_ms(elapsed)),
        None => format!("Latency for {}: unavailable", path),
    }
}

/// Records a start timing before the handler and reports the elapsed time
/// once the response is finalized.
#[derive(Debug, Clone, Default)]
pub struct LatencyHook {
    observer: Option<mpsc::UnboundedSender<LatencyReport>>,
}

impl LatencyHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also deliver every report to `observer`.
    pub fn with_observer(observer: mpsc::UnboundedSender<LatencyReport>) -> Self {
        Self {
            observer: Some(observer),
        }
    }

    fn report(&self, report: LatencyReport) {
        let status = report.outcome.to_string();

        match report.elapsed {
            Some(elapsed) => {
                tracing::info!(
                    request_id = %report.request_id,
                    method = %report.method,
                    status = %status,
                    latency_ms = duration_ms(elapsed),
                    "{}",
                    report.message()
                );
                metrics::record_request_latency(&report.method, &status, elapsed);
            }
            None => {
                tracing::warn!(
                    request_id = %report.request_id,
                    method = %report.method,
                    status = %status,
                    "{}",
                    report.message()
                );
                metrics::record_latency_unavailable();
            }
        }

        if let Some(observer) = &self.observer {
            // A closed observer only means nobody is listening anymore.
            let _ = observer.send(report);
        }
    }
}

impl RequestHook for LatencyHook {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn on_request(&self, ctx: &mut RequestContext) {
        ctx.insert(RequestTiming::now());
    }

    fn on_response(&self, ctx: &RequestContext, outcome: ResponseOutcome) {
        let elapsed = ctx.get::<RequestTiming>().map(RequestTiming::elapsed);

        self.report(LatencyReport {
            request_id: ctx.id().to_string(),
            method: ctx.method().to_string(),
            path: ctx.path().to_string(),
            outcome,
            elapsed,
        });
    }
}
