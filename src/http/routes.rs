//! Built-in route set.

use axum::{routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use crate::di::RequestScope;
use crate::http::server::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub version: String,
}

/// Routes every deployment serves. Application routes are merged on top.
pub fn base_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(Extension(scope): Extension<RequestScope>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        environment: scope.config().environment.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
