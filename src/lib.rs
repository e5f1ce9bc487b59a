//! HTTP service bootstrap.
//!
//! Loads configuration, wires the DI container, installs CORS and the
//! request-latency hooks, binds the listener, and runs a liveness heartbeat
//! until a termination signal arrives.
//!
//! # Architecture Overview
//!
//! ```text
//!   .env + process env
//!          │
//!          ▼
//!   ┌─────────────┐   ┌──────────┐   ┌─────────┐   ┌──────────────────┐
//!   │   config    │──▶│    di    │──▶│  cors   │──▶│ routes + hooks   │
//!   │ load+verify │   │container │   │ policy  │   │ (latency hook)   │
//!   └─────────────┘   └──────────┘   └─────────┘   └────────┬─────────┘
//!                                                            ▼
//!                                     ┌──────────────────────────────────┐
//!                                     │ lifecycle: bind → heartbeat →    │
//!                                     │ signals → shutdown               │
//!                                     └──────────────────────────────────┘
//! ```

pub mod config;
pub mod di;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::{Bootstrap, ServerProcess, Shutdown, StartupError};
