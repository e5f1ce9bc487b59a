//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Latency hook, heartbeat, orchestrator produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON lines)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into every latency record
//! - Recording never fails the caller

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
