//! Per-request context passed through the hook pipeline.

use axum::http::{Extensions, Method, Request};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Authenticated caller, once an auth layer exists.
///
/// Nothing populates this yet; hooks see `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    #[serde(rename = "_id")]
    pub id: String,
    pub expired_on: i64,
    pub issued_on: i64,
    pub email: String,
    pub token: String,
}

/// Value bag owned by exactly one in-flight request.
///
/// Hooks store their per-request state here (keyed by type) instead of in
/// anything shared, so concurrent requests never see each other's values.
#[derive(Debug)]
pub struct RequestContext {
    id: String,
    method: Method,
    path: String,
    auth: Option<AuthContext>,
    values: Extensions,
}

impl RequestContext {
    pub fn new(id: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            auth: None,
            values: Extensions::new(),
        }
    }

    /// Capture id, method and path-and-query from an incoming request.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        Self::new(resolve_request_id(req), req.method().clone(), path)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query as received.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn auth(&self) -> Option<&AuthContext> {
        self.auth.as_ref()
    }

    pub fn set_auth(&mut self, auth: AuthContext) {
        self.auth = Some(auth);
    }

    /// Store a value, returning the previous one of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }
}

fn is_valid_request_id(v: &str) -> bool {
    !v.is_empty()
        && v.len() <= 128
        && v.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.')
}

/// Client-supplied `x-request-id` when it is safe to log, otherwise a new UUID.
fn resolve_request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| is_valid_request_id(v))
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}
