//! Exact-match request router

use crate::{Context, Error, Handler, Result};
use async_trait::async_trait;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Router dispatching on method and exact path
///
/// Routes registered with [`Router::any`] match every method and are consulted after
/// method-specific ones.
#[derive(Default, Clone)]
pub struct Router {
    routes: HashMap<(Method, String), Arc<dyn Handler>>,
    any: HashMap<String, Arc<dyn Handler>>,
}

impl Router {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method` and `path`
    pub fn route(
        mut self,
        method: Method,
        path: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self {
        let path = path.into();
        tracing::debug!(method = %method, path = %path, "Route added to router");
        self.routes.insert((method, path), Arc::new(handler));
        self
    }

    /// Register a handler for `path` regardless of method
    pub fn any(mut self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        let path = path.into();
        tracing::debug!(path = %path, "Route added to router for all methods");
        self.any.insert(path, Arc::new(handler));
        self
    }

    /// Find the handler for a request
    pub fn match_route(&self, method: &Method, path: &str) -> Result<Arc<dyn Handler>> {
        self.routes
            .get(&(method.clone(), path.to_string()))
            .or_else(|| self.any.get(path))
            .cloned()
            .ok_or_else(|| Error::RouteNotFound(path.to_string()))
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len() + self.any.len()
    }

    /// Whether no routes are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Handler for Router {
    async fn handle(&self, ctx: &mut Context) -> Result<()> {
        let method = ctx.request().method().clone();
        let handler = self.match_route(&method, ctx.path())?;
        handler.handle(ctx).await
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut routes: Vec<String> = self
            .routes
            .keys()
            .map(|(method, path)| format!("{} {}", method, path))
            .chain(self.any.keys().map(|path| format!("* {}", path)))
            .collect();
        routes.sort();

        f.debug_struct("Router").field("routes", &routes).finish()
    }
}
