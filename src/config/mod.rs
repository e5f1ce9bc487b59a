//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! .env file (optional) + process environment
//!     → loader.rs (merge, process env wins)
//!     → schema.rs RawEnv (serde decode, all strings)
//!     → validation.rs (typed checks, every error collected)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - A validation failure is fatal at startup, never retried
//! - Sources are pluggable through `ConfigSource` so tests never touch the
//!   process environment

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_from_vars, ConfigError, ConfigSource, EnvSource, StaticSource};
pub use schema::AppConfig;
pub use validation::ValidationError;
