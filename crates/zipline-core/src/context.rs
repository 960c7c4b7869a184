//! Per-request context

use crate::body::{self, Body};
use crate::writer::{Detached, ResponseWriter};
use crate::{Error, Result};
use bytes::Bytes;
use http::{header, HeaderValue, Request, StatusCode};
use http_body_util::BodyExt;
use std::fmt;
use std::io;
use uuid::Uuid;

/// Context handed through the middleware chain for one request
///
/// Owns the request, the active response writer and the request-scoped error list.
pub struct Context {
    request_id: String,
    request: Request<Body>,
    writer: Box<dyn ResponseWriter>,
    errors: Vec<Error>,
    aborted: bool,
}

impl Context {
    /// Create a context for `request` answering through `writer`
    pub fn new(request: Request<Body>, writer: Box<dyn ResponseWriter>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            request,
            writer,
            errors: Vec::new(),
            aborted: false,
        }
    }

    /// Unique request ID for tracing
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The incoming request
    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    /// Mutable access to the incoming request
    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    /// Request path
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    /// First value of a request header, if it is valid text
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// Take the request body, leaving an empty one behind
    pub fn take_body(&mut self) -> Body {
        std::mem::replace(self.request.body_mut(), body::empty())
    }

    /// Replace the request body
    pub fn set_body(&mut self, body: Body) {
        *self.request.body_mut() = body;
    }

    /// Read the whole request body
    pub async fn body_bytes(&mut self) -> Result<Bytes> {
        let collected = self
            .take_body()
            .collect()
            .await
            .map_err(|e| Error::Body(e.to_string()))?;
        Ok(collected.to_bytes())
    }

    /// Active response writer
    pub fn writer(&self) -> &dyn ResponseWriter {
        self.writer.as_ref()
    }

    /// Mutable access to the active response writer
    pub fn writer_mut(&mut self) -> &mut dyn ResponseWriter {
        self.writer.as_mut()
    }

    /// Remove the active writer, leaving a [`Detached`] placeholder
    pub fn take_writer(&mut self) -> Box<dyn ResponseWriter> {
        std::mem::replace(&mut self.writer, Box::new(Detached::default()))
    }

    /// Install a response writer
    pub fn set_writer(&mut self, writer: Box<dyn ResponseWriter>) {
        self.writer = writer;
    }

    /// Set the response status
    pub fn status(&mut self, status: StatusCode) {
        self.writer.write_header(status);
    }

    /// Set a response header
    pub fn set_header(&mut self, name: header::HeaderName, value: HeaderValue) {
        self.writer.headers_mut().insert(name, value);
    }

    /// Write a plain-text response
    pub async fn string(&mut self, status: StatusCode, s: &str) -> io::Result<usize> {
        self.status(status);
        if !self.writer.headers().contains_key(header::CONTENT_TYPE) {
            self.set_header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
        self.writer.write_str(s).await
    }

    /// Write a response with an explicit content type
    pub async fn data(
        &mut self,
        status: StatusCode,
        content_type: &'static str,
        data: &[u8],
    ) -> io::Result<usize> {
        self.status(status);
        self.set_header(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.writer.write(data).await
    }

    /// Attach a request-scoped error
    pub fn error(&mut self, err: Error) {
        self.errors.push(err);
    }

    /// Errors attached while serving this request
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Stop the chain: pending middleware and the handler are skipped
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Abort and set the response status
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.status(status);
        self.abort();
    }

    /// Whether the chain was aborted
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("writer", &self.writer)
            .field("errors", &self.errors.len())
            .field("aborted", &self.aborted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BodyWriter;
    use futures::channel::{mpsc, oneshot};

    fn context(request: Request<Body>) -> Context {
        let (head_tx, _head_rx) = oneshot::channel();
        let (chunk_tx, _chunk_rx) = mpsc::channel(1);
        Context::new(request, Box::new(BodyWriter::new(head_tx, chunk_tx)))
    }

    #[test]
    fn test_request_accessors() {
        let req = Request::builder()
            .uri("/books/1?x=y")
            .header(header::ACCEPT, "text/plain")
            .body(body::empty())
            .unwrap();
        let ctx = context(req);

        assert!(!ctx.request_id().is_empty());
        assert_eq!(ctx.path(), "/books/1");
        assert_eq!(ctx.header(header::ACCEPT), Some("text/plain"));
        assert_eq!(ctx.header(header::ACCEPT_ENCODING), None);
    }

    #[tokio::test]
    async fn test_body_bytes() {
        let req = Request::builder().body(body::full("payload")).unwrap();
        let mut ctx = context(req);

        assert_eq!(&ctx.body_bytes().await.unwrap()[..], b"payload");
        assert!(ctx.body_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_string_sets_status_and_type() {
        let req = Request::builder().body(body::empty()).unwrap();
        let mut ctx = context(req);

        ctx.string(StatusCode::ACCEPTED, "ok").await.unwrap();
        assert_eq!(ctx.writer().status(), StatusCode::ACCEPTED);
        assert_eq!(
            ctx.writer().headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(ctx.writer().size(), 2);
    }

    #[test]
    fn test_take_writer_leaves_placeholder() {
        let req = Request::builder().body(body::empty()).unwrap();
        let mut ctx = context(req);

        let writer = ctx.take_writer();
        assert!(!writer.written());
        assert!(ctx.writer().written());

        ctx.set_writer(writer);
        assert!(!ctx.writer().written());
    }

    #[test]
    fn test_abort() {
        let req = Request::builder().body(body::empty()).unwrap();
        let mut ctx = context(req);

        ctx.abort_with_status(StatusCode::BAD_REQUEST);
        assert!(ctx.is_aborted());
        assert_eq!(ctx.writer().status(), StatusCode::BAD_REQUEST);
    }
}
