//! Middleware trait and utilities

use crate::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Middleware trait for request/response processing
#[async_trait]
pub trait Middleware: Send + Sync + fmt::Debug {
    /// Process a request
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context of the request being served
    /// * `next` - The next middleware/handler in the chain
    ///
    /// Work placed after `next.run(ctx).await` runs once everything downstream has
    /// returned.
    async fn call(&self, ctx: &mut Context, next: Next) -> Result<()>;
}

/// Final request handler at the end of the chain
#[async_trait]
pub trait Handler: Send + Sync + fmt::Debug {
    /// Serve the request by writing to the context's response writer
    async fn handle(&self, ctx: &mut Context) -> Result<()>;
}

/// Represents the next middleware/handler in the chain
pub struct Next {
    middleware_stack: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    handler: Option<Arc<dyn Handler>>,
}

impl Next {
    /// Create a new Next from a middleware stack
    pub fn new(middleware_stack: Arc<[Arc<dyn Middleware>]>) -> Self {
        Self {
            middleware_stack,
            index: 0,
            handler: None,
        }
    }

    /// Create a new Next with a final handler
    pub fn with_handler(
        middleware_stack: Arc<[Arc<dyn Middleware>]>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            middleware_stack,
            index: 0,
            handler: Some(handler),
        }
    }

    /// Run the next middleware or final handler
    ///
    /// Does nothing once the context has been aborted.
    pub async fn run(self, ctx: &mut Context) -> Result<()> {
        if ctx.is_aborted() {
            return Ok(());
        }

        if let Some(middleware) = self.middleware_stack.get(self.index) {
            let next = Self {
                middleware_stack: Arc::clone(&self.middleware_stack),
                index: self.index + 1,
                handler: self.handler.clone(),
            };
            middleware.call(ctx, next).await
        } else if let Some(handler) = self.handler {
            handler.handle(ctx).await
        } else {
            Ok(())
        }
    }
}

impl Clone for Next {
    fn clone(&self) -> Self {
        Self {
            middleware_stack: Arc::clone(&self.middleware_stack),
            index: self.index,
            handler: self.handler.clone(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &(self.middleware_stack.len() - self.index))
            .field("handler", &self.handler)
            .finish()
    }
}

/// Helper macro for defining a unit-struct [`Handler`]
///
/// ```ignore
/// zipline_core::handler_fn!(Hello, |ctx| {
///     ctx.string(StatusCode::OK, "hello").await?;
///     Ok(())
/// });
/// ```
#[macro_export]
macro_rules! handler_fn {
    ($name:ident, |$ctx:ident| $body:block) => {
        #[derive(Debug)]
        struct $name;

        #[$crate::async_trait]
        impl $crate::Handler for $name {
            async fn handle(&self, $ctx: &mut $crate::Context) -> $crate::Result<()> {
                $body
            }
        }
    };
}
