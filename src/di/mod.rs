//! Dependency injection.
//!
//! # Data Flow
//! ```text
//! AppConfig (loaded)
//!     → Container::new (singletons, shared across requests)
//!     → scope_middleware (one RequestScope per request, in extensions)
//!     → handlers resolve through Extension<RequestScope>
//! ```

pub mod container;

pub use container::{scope_middleware, Container, RequestScope};
