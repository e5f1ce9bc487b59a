//! Periodic liveness heartbeat.
//!
//! # Responsibilities
//! - Log a fixed message once per interval while the server runs
//! - Stop on shutdown
//!
//! # Design Decisions
//! - Ticks are scheduled on a fixed period, first one a full interval after
//!   start; missed ticks are skipped rather than bursted
//! - Ticks are independent: no backoff, no retry, nothing carried over

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::lifecycle::shutdown::ShutdownSignal;
use crate::observability::metrics;

pub const HEARTBEAT_MESSAGE: &str = "Backend is up";

/// Heartbeat schedule.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    interval: Duration,
}

impl Heartbeat {
    /// Zero intervals are raised to one millisecond.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking until `shutdown` fires or the handle is stopped.
    pub fn spawn(self, mut shutdown: ShutdownSignal) -> HeartbeatHandle {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!(interval_ms = period.as_millis() as u64, "Heartbeat started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        counter.fetch_add(1, Ordering::Relaxed);
                        metrics::record_heartbeat();
                        tracing::info!("{}", HEARTBEAT_MESSAGE);
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Heartbeat stopping");
                        break;
                    }
                }
            }
        });

        HeartbeatHandle { task, ticks }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(crate::config::schema::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Owned handle to a running heartbeat.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
    ticks: Arc<AtomicU64>,
}

impl HeartbeatHandle {
    /// Ticks fired so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort immediately; a tick in progress is abandoned.
    pub fn stop(&self) {
        self.task.abort();
    }
}
