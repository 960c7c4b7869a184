//! Response writers
//!
//! Handlers produce their response by writing to a [`ResponseWriter`]. Middleware may
//! interpose its own writer in front of the one installed in the [`Context`](crate::Context)
//! and peel it off again with [`ResponseWriter::into_inner`].

use crate::Result;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::channel::{mpsc, oneshot};
use futures::SinkExt;
use http::{HeaderMap, Response, StatusCode};
use std::fmt;
use std::io;

/// Bytes the base writer holds before committing the response head
pub const WRITE_BUFFER_SIZE: usize = 4096;

/// Sink for a response: status, headers and body bytes
#[async_trait]
pub trait ResponseWriter: Send + fmt::Debug {
    /// Response headers
    fn headers(&self) -> &HeaderMap;

    /// Mutable response headers
    ///
    /// Changes only reach the client while [`written`](Self::written) is false.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Status that will be (or was) sent
    fn status(&self) -> StatusCode;

    /// Record the response status
    fn write_header(&mut self, status: StatusCode);

    /// Write body bytes, returning how many were accepted
    async fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Write a text chunk
    async fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.write(s.as_bytes()).await
    }

    /// Push buffered bytes towards the client
    async fn flush(&mut self) -> io::Result<()>;

    /// Body bytes handed to the underlying transport so far
    fn size(&self) -> usize;

    /// Whether the status line and headers have already been sent
    fn written(&self) -> bool;

    /// Complete any deferred output once the handler chain has returned
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Unwrap an interposed writer, handing back the writer it wraps
    ///
    /// Base writers return `None`.
    fn into_inner(self: Box<Self>) -> Option<Box<dyn ResponseWriter>> {
        None
    }
}

/// Base writer feeding the engine's response
///
/// The head is committed on the first flush: when the buffer reaches
/// [`WRITE_BUFFER_SIZE`], on an explicit [`flush`](ResponseWriter::flush), or at
/// [`finish`](ResponseWriter::finish). Until then headers stay mutable.
pub struct BodyWriter {
    status: StatusCode,
    headers: HeaderMap,
    buffer: BytesMut,
    size: usize,
    head: Option<oneshot::Sender<Response<()>>>,
    chunks: mpsc::Sender<Bytes>,
}

impl BodyWriter {
    /// Create a writer committing its head to `head` and its body chunks to `chunks`
    pub fn new(head: oneshot::Sender<Response<()>>, chunks: mpsc::Sender<Bytes>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            buffer: BytesMut::with_capacity(WRITE_BUFFER_SIZE),
            size: 0,
            head: Some(head),
            chunks,
        }
    }

    fn commit(&mut self) {
        let Some(head) = self.head.take() else {
            return;
        };

        let mut response = Response::new(());
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();

        tracing::trace!(status = %self.status, "Response head committed");

        // The engine only stops listening when it has given up on this response.
        let _ = head.send(response);
    }

    async fn drain(&mut self) -> io::Result<()> {
        self.commit();

        if self.buffer.is_empty() {
            return Ok(());
        }

        let chunk = self.buffer.split().freeze();
        self.chunks
            .send(chunk)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body receiver dropped"))
    }
}

impl fmt::Debug for BodyWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyWriter")
            .field("status", &self.status)
            .field("buffered", &self.buffer.len())
            .field("size", &self.size)
            .field("written", &self.written())
            .finish()
    }
}

#[async_trait]
impl ResponseWriter for BodyWriter {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.written() {
            tracing::warn!(
                status = %status,
                sent = %self.status,
                "Response headers were already written, ignoring status"
            );
            return;
        }
        self.status = status;
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(data);
        self.size += data.len();

        if self.buffer.len() >= WRITE_BUFFER_SIZE {
            self.drain().await?;
        }

        Ok(data.len())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.drain().await
    }

    fn size(&self) -> usize {
        self.size
    }

    fn written(&self) -> bool {
        self.head.is_none()
    }

    async fn finish(&mut self) -> Result<()> {
        self.drain().await?;
        Ok(())
    }
}

/// Placeholder installed while a middleware holds the real writer
///
/// Accepts nothing; every write fails.
#[derive(Debug, Default)]
pub struct Detached {
    headers: HeaderMap,
}

#[async_trait]
impl ResponseWriter for Detached {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn write_header(&mut self, _status: StatusCode) {}

    async fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "response writer is detached",
        ))
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn size(&self) -> usize {
        0
    }

    fn written(&self) -> bool {
        true
    }
}
