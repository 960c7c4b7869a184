//! Request engine
//!
//! Turns an `http::Request` into an `http::Response` by running the middleware chain and
//! handler on a spawned task. The response head is returned as soon as the base writer
//! commits it; the body streams behind it.

use crate::body::{self, Body, BoxError};
use crate::router::Router;
use crate::writer::{BodyWriter, ResponseWriter};
use crate::{Context, Error, Handler, Middleware, Next};
use bytes::Bytes;
use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, StreamExt};
use http::{Request, Response, StatusCode};
use http_body::Frame;
use http_body_util::StreamBody;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// Body chunks in flight between the handler task and the client
const CHUNK_CHANNEL_CAPACITY: usize = 16;

/// Middleware chain plus final handler
#[derive(Clone)]
pub struct Engine {
    middleware: Arc<[Arc<dyn Middleware>]>,
    handler: Arc<dyn Handler>,
}

impl Engine {
    /// Start building an engine
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Serve one request
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let (head_tx, head_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);

        let ctx = Context::new(request, Box::new(BodyWriter::new(head_tx, chunk_tx)));
        let span = tracing::info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %ctx.request().method(),
            path = %ctx.path(),
        );
        let next = Next::with_handler(Arc::clone(&self.middleware), Arc::clone(&self.handler));

        tokio::spawn(serve(ctx, next).instrument(span));

        match head_rx.await {
            Ok(head) => {
                let (parts, ()) = head.into_parts();
                let frames = chunk_rx.map(|chunk: Bytes| Ok::<_, BoxError>(Frame::data(chunk)));
                Response::from_parts(parts, body::boxed(StreamBody::new(frames)))
            }
            Err(_) => {
                let mut response = Response::new(body::empty());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("middleware", &self.middleware)
            .field("handler", &self.handler)
            .finish()
    }
}

async fn serve(mut ctx: Context, next: Next) {
    let outcome = AssertUnwindSafe(next.run(&mut ctx)).catch_unwind().await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Request failed");
            if !ctx.writer().written() {
                ctx.status(e.to_status_code());
            }
            ctx.error(e);
        }
        Err(panic) => {
            // Dropping the writers without committing answers 500, or cuts the
            // body short if the head already went out.
            let err = Error::Panic(panic_message(panic.as_ref()));
            tracing::error!(error = %err, "Handler panicked");
            return;
        }
    }

    let mut writer = ctx.take_writer();
    let (status, bytes) = loop {
        if let Err(e) = writer.finish().await {
            tracing::error!(error = %e, "Failed to finish response");
            ctx.error(e);
        }
        // Read before `into_inner` consumes the writer.
        let sent = (writer.status(), writer.size());
        match writer.into_inner() {
            Some(inner) => writer = inner,
            None => break sent,
        }
    };

    tracing::debug!(
        status = %status,
        bytes,
        errors = ctx.errors().len(),
        "Request completed"
    );
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for [`Engine`]
#[derive(Default)]
pub struct EngineBuilder {
    middleware: Vec<Arc<dyn Middleware>>,
    handler: Option<Arc<dyn Handler>>,
}

impl EngineBuilder {
    /// Append a middleware; middleware runs in registration order
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Set the final handler
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Build the engine
    ///
    /// Without a handler every request ends in 404.
    pub fn build(self) -> Engine {
        Engine {
            middleware: Arc::from(self.middleware),
            handler: self
                .handler
                .unwrap_or_else(|| Arc::new(Router::new()) as Arc<dyn Handler>),
        }
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("middleware", &self.middleware.len())
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
