//! CORS policy applied to every response.

use axum::http::{header::HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Methods allowed for cross-origin requests.
pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::PUT,
    Method::POST,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
];

/// Request headers browsers may send cross-origin.
pub const ALLOWED_HEADERS: [&str; 11] = [
    "x-csrf-token",
    "x-requested-with",
    "accept",
    "accept-version",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "x-api-version",
    "authorization",
    "anonymous",
];

/// Which origins may call the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    Any,
    List(Vec<HeaderValue>),
}

/// Static cross-origin policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    pub origins: OriginPolicy,
    pub methods: Vec<Method>,
    pub allowed_headers: Vec<HeaderName>,
    pub allow_credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            origins: OriginPolicy::Any,
            methods: ALLOWED_METHODS.to_vec(),
            allowed_headers: ALLOWED_HEADERS
                .into_iter()
                .map(HeaderName::from_static)
                .collect(),
            allow_credentials: true,
        }
    }
}

impl CorsPolicy {
    /// Build the tower-http layer for this policy.
    ///
    /// Browsers reject a literal `*` origin on credentialed requests, so a
    /// wildcard policy with credentials echoes the caller's origin instead.
    pub fn layer(&self) -> CorsLayer {
        let origin = match (&self.origins, self.allow_credentials) {
            (OriginPolicy::Any, true) => AllowOrigin::mirror_request(),
            (OriginPolicy::Any, false) => AllowOrigin::from(Any),
            (OriginPolicy::List(origins), _) => AllowOrigin::list(origins.iter().cloned()),
        };

        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(self.methods.clone())
            .allow_headers(self.allowed_headers.clone())
            .allow_credentials(self.allow_credentials)
    }
}
