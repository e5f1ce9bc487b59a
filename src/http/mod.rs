//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → hooks.rs (RequestContext created, before-handler hooks)
//!     → cors.rs (preflight answered, headers on every response)
//!     → DI scope attached (crate::di)
//!     → routes.rs / application routes
//!     → hooks.rs (after-response hooks, exactly once)
//!     → Send to client
//! ```

pub mod context;
pub mod cors;
pub mod hooks;
pub mod latency;
pub mod routes;
pub mod server;

pub use context::{AuthContext, RequestContext, X_REQUEST_ID};
pub use cors::CorsPolicy;
pub use hooks::{HookPipeline, RequestHook, ResponseOutcome};
pub use latency::{LatencyHook, LatencyReport, RequestTiming};
pub use server::{AppState, HttpServer};
