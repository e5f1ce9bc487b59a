//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router from the registered route set
//! - Wire up middleware (hooks, CORS, panic capture, DI scope)
//! - Serve on an already-bound listener
//!
//! # Layer order (outermost first)
//! ```text
//! hooks → CORS → catch-panic → DI scope → routes
//! ```
//! Hooks wrap everything so even CORS preflights and handler panics get a
//! completion callback. CORS wraps every route, including ones merged later
//! by the application.

use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::AppConfig;
use crate::di::{scope_middleware, Container};
use crate::http::cors::CorsPolicy;
use crate::http::hooks::{hook_middleware, HookPipeline};

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub container: Container,
}

impl AppState {
    pub fn config(&self) -> &Arc<AppConfig> {
        self.container.config()
    }
}

/// The registered HTTP application.
pub struct HttpServer {
    router: Router,
    hooks: Arc<HookPipeline>,
}

impl HttpServer {
    /// Assemble the router. Requires a `Container`, which only exists once
    /// configuration has loaded.
    pub fn new(
        container: Container,
        cors: &CorsPolicy,
        hooks: HookPipeline,
        routes: Router<AppState>,
    ) -> Self {
        let hooks = Arc::new(hooks);
        let router = Self::build_router(container, cors, Arc::clone(&hooks), routes);
        Self { router, hooks }
    }

    fn build_router(
        container: Container,
        cors: &CorsPolicy,
        hooks: Arc<HookPipeline>,
        routes: Router<AppState>,
    ) -> Router {
        let state = AppState {
            container: container.clone(),
        };

        routes
            .with_state(state)
            .layer(middleware::from_fn_with_state(container, scope_middleware))
            .layer(CatchPanicLayer::new())
            .layer(cors.layer())
            .layer(middleware::from_fn_with_state(hooks, hook_middleware))
    }

    /// A clone of the assembled router, for in-process dispatch.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn hooks(&self) -> &Arc<HookPipeline> {
        &self.hooks
    }

    /// Serve until the task is aborted or the listener fails.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::debug!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
