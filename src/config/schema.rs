//! Configuration schema definitions.
//!
//! `RawEnv` mirrors the environment keys as strings exactly as they arrive;
//! `AppConfig` is the validated, typed result shared with every subsystem.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

/// Default listen port when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 3000;

/// Default heartbeat cadence (`HEARTBEAT_INTERVAL_MS`).
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Environment keys before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEnv {
    #[serde(rename = "NODE_ENV")]
    pub node_env: Option<String>,

    #[serde(rename = "PORT")]
    pub port: Option<String>,

    #[serde(rename = "HOST")]
    pub host: Option<String>,

    #[serde(rename = "HEARTBEAT_INTERVAL_MS")]
    pub heartbeat_interval_ms: Option<String>,

    #[serde(rename = "METRICS_ADDRESS")]
    pub metrics_address: Option<String>,
}

/// Validated application configuration.
///
/// Immutable once loaded; shared via `Arc` after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Deployment environment name (`NODE_ENV`).
    pub environment: String,

    /// Listen port (`PORT`).
    pub port: u16,

    /// Interface to bind (`HOST`).
    pub host: IpAddr,

    /// Period between liveness heartbeats.
    pub heartbeat_interval: Duration,

    /// Prometheus exporter address, if metrics are enabled.
    pub metrics_address: Option<SocketAddr>,
}

impl RawEnv {
    /// Every key this struct reads.
    pub const KEYS: [&'static str; 5] = [
        "NODE_ENV",
        "PORT",
        "HOST",
        "HEARTBEAT_INTERVAL_MS",
        "METRICS_ADDRESS",
    ];
}

impl AppConfig {
    /// Build a config for the given environment and port, other keys defaulted.
    pub fn new(environment: impl Into<String>, port: u16) -> Self {
        Self {
            environment: environment.into(),
            port,
            ..Self::default()
        }
    }

    /// Address the listener binds to.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            metrics_address: None,
        }
    }
}
