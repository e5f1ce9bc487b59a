//! Typed service container with per-request scopes.

use std::any::{Any, TypeId};
use std::sync::Arc;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use dashmap::DashMap;

use crate::config::AppConfig;

type Registry = DashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Process-wide service container.
///
/// Can only be built from a loaded `AppConfig`, so nothing that needs the
/// container can be registered before the configuration is ready.
#[derive(Clone)]
pub struct Container {
    config: Arc<AppConfig>,
    singletons: Arc<Registry>,
}

impl Container {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            singletons: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        &self.config
    }

    /// Register a singleton, replacing any previous value of the same type.
    pub fn register<T: Send + Sync + 'static>(&self, value: T) {
        self.singletons.insert(TypeId::of::<T>(), Arc::new(value));
    }

    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        lookup(&self.singletons)
    }

    /// Number of registered singletons.
    pub fn len(&self) -> usize {
        self.singletons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty()
    }

    /// Open a scope whose registrations shadow the container's.
    pub fn create_scope(&self) -> RequestScope {
        RequestScope {
            parent: self.clone(),
            locals: Arc::new(DashMap::new()),
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("environment", &self.config.environment)
            .field("singletons", &self.singletons.len())
            .finish()
    }
}

/// Registrations that live for a single request.
///
/// Dropped with the request; nothing is disposed explicitly.
#[derive(Clone)]
pub struct RequestScope {
    parent: Container,
    locals: Arc<Registry>,
}

impl RequestScope {
    pub fn register<T: Send + Sync + 'static>(&self, value: T) {
        self.locals.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Resolve from the scope first, then from the container.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        lookup(&self.locals).or_else(|| self.parent.resolve())
    }

    pub fn config(&self) -> &Arc<AppConfig> {
        self.parent.config()
    }
}

fn lookup<T: Send + Sync + 'static>(registry: &Registry) -> Option<Arc<T>> {
    let entry = registry.get(&TypeId::of::<T>())?;
    Arc::clone(entry.value()).downcast::<T>().ok()
}

/// Attach a fresh `RequestScope` to every request's extensions.
pub async fn scope_middleware(
    State(container): State<Container>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    req.extensions_mut().insert(container.create_scope());
    next.run(req).await
}
