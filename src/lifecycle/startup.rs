//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration before anything else
//! - Register DI, CORS and routes (with the hook pipeline), in that order
//! - Bind the listener, then start the heartbeat and signal handlers
//! - Own every task it starts, so shutdown is explicit per instance
//!
//! # Design Decisions
//! - Fail fast: config and bind errors are fatal and never retried
//! - Registration needs a `Container`, which needs a loaded `AppConfig`,
//!   so nothing can be registered ahead of config readiness
//! - Shutdown aborts the server and heartbeat immediately; no drain window

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{AppConfig, ConfigError, ConfigSource};
use crate::di::Container;
use crate::http::cors::CorsPolicy;
use crate::http::hooks::HookPipeline;
use crate::http::latency::{LatencyHook, LatencyReport};
use crate::http::routes::base_routes;
use crate::http::server::{AppState, HttpServer};
use crate::lifecycle::heartbeat::{Heartbeat, HeartbeatHandle};
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};
use crate::lifecycle::signals;
use crate::lifecycle::state::{Lifecycle, LifecycleError, LifecycleState};
use crate::observability::metrics;

/// Fatal startup failures. Every variant maps to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Configures and starts one server instance.
pub struct Bootstrap<S> {
    source: S,
    lifecycle: Arc<Lifecycle>,
    routes: Router<AppState>,
    cors: CorsPolicy,
    latency_observer: Option<mpsc::UnboundedSender<LatencyReport>>,
    install_signals: bool,
}

impl<S: ConfigSource> Bootstrap<S> {
    /// Construction enters `ConfigLoading`.
    pub fn new(source: S) -> Self {
        let lifecycle = Arc::new(Lifecycle::new());
        if let Err(e) = lifecycle.transition(LifecycleState::ConfigLoading) {
            tracing::error!(error = %e, "Lifecycle rejected config loading");
        }

        Self {
            source,
            lifecycle,
            routes: base_routes(),
            cors: CorsPolicy::default(),
            latency_observer: None,
            install_signals: true,
        }
    }

    /// Merge application routes into the built-in set.
    pub fn with_routes(mut self, routes: Router<AppState>) -> Self {
        self.routes = self.routes.merge(routes);
        self
    }

    pub fn with_cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    /// Receive every latency report in addition to the log line.
    pub fn with_latency_observer(mut self, observer: mpsc::UnboundedSender<LatencyReport>) -> Self {
        self.latency_observer = Some(observer);
        self
    }

    /// Skip OS signal handlers; shutdown is then programmatic only.
    pub fn without_signal_handlers(mut self) -> Self {
        self.install_signals = false;
        self
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Run the startup sequence up to `Running`.
    pub async fn start(self) -> Result<ServerProcess, StartupError> {
        let Bootstrap {
            source,
            lifecycle,
            routes,
            cors,
            latency_observer,
            install_signals,
        } = self;

        let config = match source.load() {
            Ok(config) => Arc::new(config),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load environment variables");
                lifecycle.fail()?;
                return Err(e.into());
            }
        };
        tracing::info!(
            environment = %config.environment,
            port = config.port,
            "Environment variables loaded"
        );

        lifecycle.transition(LifecycleState::Registering)?;
        let server = register(Arc::clone(&config), &cors, routes, latency_observer);

        lifecycle.transition(LifecycleState::Listening)?;
        let addr = config.bind_address();
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                tracing::error!(address = %addr, error = %source, "Failed to bind listener");
                lifecycle.fail()?;
                return Err(StartupError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr().map_err(|source| StartupError::Bind { addr, source })?;

        if let Some(metrics_addr) = config.metrics_address {
            if let Err(e) = metrics::init_metrics(metrics_addr) {
                tracing::warn!(address = %metrics_addr, error = %e, "Metrics exporter not started");
            }
        }

        let server_task = tokio::spawn(async move {
            if let Err(e) = server.run(listener).await {
                tracing::error!(error = %e, "HTTP server failed");
            }
        });

        let shutdown = Shutdown::new();
        let signal_task = if install_signals {
            match signals::install(shutdown.clone()) {
                Ok(task) => Some(task),
                Err(e) => {
                    server_task.abort();
                    tracing::error!(error = %e, "Failed to install signal handlers");
                    lifecycle.fail()?;
                    return Err(StartupError::Signals(e));
                }
            }
        } else {
            None
        };

        lifecycle.transition(LifecycleState::Running)?;
        let heartbeat = Heartbeat::new(config.heartbeat_interval).spawn(shutdown.subscribe());

        tracing::info!(address = %local_addr, "Server is ready");

        Ok(ServerProcess {
            config,
            lifecycle,
            shutdown,
            local_addr,
            server_task,
            signal_task,
            heartbeat,
        })
    }
}

/// DI, then CORS, then routes with the hook pipeline.
fn register(
    config: Arc<AppConfig>,
    cors: &CorsPolicy,
    routes: Router<AppState>,
    latency_observer: Option<mpsc::UnboundedSender<LatencyReport>>,
) -> HttpServer {
    let container = Container::new(config);
    tracing::info!("DI registered");

    tracing::info!(credentials = cors.allow_credentials, "CORS registered");

    let latency = match latency_observer {
        Some(observer) => LatencyHook::with_observer(observer),
        None => LatencyHook::new(),
    };
    let hooks = HookPipeline::new().with_hook(latency);
    let server = HttpServer::new(container, cors, hooks, routes);
    tracing::info!(hooks = ?server.hooks().names(), "Routes registered");

    server
}

/// A started server and every task it owns.
#[derive(Debug)]
pub struct ServerProcess {
    config: Arc<AppConfig>,
    lifecycle: Arc<Lifecycle>,
    shutdown: Shutdown,
    local_addr: SocketAddr,
    server_task: JoinHandle<()>,
    signal_task: Option<JoinHandle<()>>,
    heartbeat: HeartbeatHandle,
}

impl ServerProcess {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    /// Handle for triggering shutdown programmatically.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn heartbeat(&self) -> &HeartbeatHandle {
        &self.heartbeat
    }

    /// Block until a signal (or programmatic trigger) arrives, then stop.
    pub async fn wait(self) -> ShutdownReason {
        let reason = self.shutdown.wait().await;
        self.terminate(reason)
    }

    /// Trigger shutdown now and stop.
    pub fn stop(self) -> ShutdownReason {
        self.shutdown.trigger(ShutdownReason::Requested);
        let reason = self.shutdown.reason().unwrap_or(ShutdownReason::Requested);
        self.terminate(reason)
    }

    fn terminate(self, reason: ShutdownReason) -> ShutdownReason {
        if let Err(e) = self.lifecycle.transition(LifecycleState::ShuttingDown) {
            tracing::warn!(error = %e, "Unexpected lifecycle state at shutdown");
        }
        tracing::info!(reason = %reason, "Shutting down");

        self.heartbeat.stop();
        self.server_task.abort();
        if let Some(task) = &self.signal_task {
            task.abort();
        }

        if let Err(e) = self.lifecycle.transition(LifecycleState::Terminated) {
            tracing::warn!(error = %e, "Unexpected lifecycle state at termination");
        }
        tracing::info!("Shutdown complete");
        reason
    }
}
