//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::{extract::Path, routing::get, Router};
use backend_server::config::AppConfig;
use backend_server::http::AppState;
use tokio::net::TcpStream;

/// Loopback config on a fixed port.
pub fn local_config(port: u16) -> AppConfig {
    AppConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        ..AppConfig::new("test", port)
    }
}

/// `GET /delay/{ms}` sleeps for `ms` milliseconds, then answers `ok`.
pub fn delay_routes() -> Router<AppState> {
    Router::new().route(
        "/delay/{ms}",
        get(|Path(ms): Path<u64>| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            "ok"
        }),
    )
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait until something accepts connections on `addr`.
pub async fn wait_for_listener(addr: SocketAddr, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
