//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Register DI → Register CORS → Register routes + hooks
//!     → Bind listener → Start heartbeat + signal handlers → Running
//!
//! Heartbeat (heartbeat.rs):
//!     Fixed-period tick → "Backend is up"
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGQUIT → shutdown.rs trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → abort server + heartbeat → Terminated
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then registration, listener last
//! - Every transition goes through state.rs and is validated
//! - Task handles are owned by `ServerProcess`; nothing is global

pub mod heartbeat;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use heartbeat::{Heartbeat, HeartbeatHandle, HEARTBEAT_MESSAGE};
pub use shutdown::{Shutdown, ShutdownReason, ShutdownSignal};
pub use startup::{Bootstrap, ServerProcess, StartupError};
pub use state::{Lifecycle, LifecycleError, LifecycleState};
