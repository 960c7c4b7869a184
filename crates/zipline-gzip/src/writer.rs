//! Adaptive gzip response writer
//!
//! [`GzipWriter`] sits between the handler and the real response writer and defers the
//! decision to compress until enough body bytes have been seen. Small responses are
//! buffered and sent verbatim when the handler returns; once the buffered total reaches
//! the threshold the writer switches, for good, to streaming compressed output.

use crate::pool::PooledCompressor;
use async_trait::async_trait;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::{HeaderMap, HeaderValue, StatusCode};
use std::fmt;
use std::io;
use tracing::debug;
use zipline_core::{Error, ResponseWriter, Result};

/// Where a [`GzipWriter`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing written yet
    Unset,
    /// Holding bytes below the threshold
    Buffering,
    /// Compressing everything written
    Streaming,
    /// Response completed; further writes fail
    Finished,
}

/// Response writer compressing the body once it reaches a minimum length
pub struct GzipWriter {
    inner: Box<dyn ResponseWriter>,
    compressor: PooledCompressor,
    buffer: Vec<u8>,
    min_length: usize,
    phase: Phase,
    compressed: bool,
}

impl GzipWriter {
    /// Wrap `inner`, compressing with `compressor` once `min_length` bytes are written
    pub fn new(
        inner: Box<dyn ResponseWriter>,
        compressor: PooledCompressor,
        min_length: usize,
    ) -> Self {
        Self {
            inner,
            compressor,
            buffer: Vec::new(),
            min_length,
            phase: Phase::Unset,
            compressed: false,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the response body is gzip-encoded
    pub fn is_compressing(&self) -> bool {
        self.compressed
    }

    fn commit(&mut self) {
        let headers = self.inner.headers_mut();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
        headers.remove(CONTENT_LENGTH);

        self.phase = Phase::Streaming;
        self.compressed = true;
        debug!(min_length = self.min_length, "Compressing response");
    }

    async fn compress(&mut self, data: &[u8]) -> io::Result<()> {
        self.compressor.write(data)?;
        self.forward().await
    }

    async fn forward(&mut self) -> io::Result<()> {
        let out = self.compressor.take_output();
        if !out.is_empty() {
            self.inner.write(&out).await?;
        }
        Ok(())
    }

    // The head already went out uncompressed, so the rest must follow it verbatim.
    async fn pass_through(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.buffer.is_empty() {
            let buffered = std::mem::take(&mut self.buffer);
            self.inner.write(&buffered).await?;
        }
        self.inner.write(data).await?;
        Ok(())
    }

    fn set_content_length(&mut self, pending: usize) {
        if self.inner.written() {
            return;
        }
        let total = self.inner.size() + pending;
        self.inner
            .headers_mut()
            .insert(CONTENT_LENGTH, HeaderValue::from(total));
    }

    async fn finish_compressed(&mut self) -> io::Result<()> {
        self.compressor.finish()?;
        let tail = self.compressor.take_output();
        self.set_content_length(tail.len());
        self.inner.write(&tail).await?;
        Ok(())
    }

    async fn finish_uncompressed(&mut self) -> io::Result<()> {
        if let Err(e) = self.compressor.reset() {
            debug!(error = %e, "Failed to reset unused compressor");
        }

        let buffered = std::mem::take(&mut self.buffer);
        self.set_content_length(buffered.len());
        if !buffered.is_empty() {
            self.inner.write(&buffered).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ResponseWriter for GzipWriter {
    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn status(&self) -> StatusCode {
        self.inner.status()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.inner.headers_mut().remove(CONTENT_LENGTH);
        self.inner.write_header(status);
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.phase {
            Phase::Finished => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "gzip writer already finished",
                ));
            }
            Phase::Streaming => self.compress(data).await?,
            Phase::Unset | Phase::Buffering if self.inner.written() => {
                self.phase = Phase::Buffering;
                self.pass_through(data).await?;
            }
            Phase::Unset | Phase::Buffering => {
                if data.len() >= self.min_length {
                    self.commit();
                    let buffered = std::mem::take(&mut self.buffer);
                    if !buffered.is_empty() {
                        self.compressor.write(&buffered)?;
                    }
                    self.compress(data).await?;
                } else {
                    self.buffer.extend_from_slice(data);
                    self.phase = Phase::Buffering;

                    if self.buffer.len() >= self.min_length {
                        self.commit();
                        let buffered = std::mem::take(&mut self.buffer);
                        self.compress(&buffered).await?;
                    }
                }
            }
        }

        Ok(data.len())
    }

    async fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.inner.headers_mut().remove(CONTENT_LENGTH);
        self.write(s.as_bytes()).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        if self.phase == Phase::Streaming {
            self.compressor.flush()?;
            self.forward().await?;
        }
        self.inner.flush().await
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn written(&self) -> bool {
        self.inner.written()
    }

    async fn finish(&mut self) -> Result<()> {
        match self.phase {
            Phase::Finished => Ok(()),
            Phase::Streaming => {
                self.phase = Phase::Finished;
                self.finish_compressed()
                    .await
                    .map_err(|e| Error::compression("closing and flushing gzip writer", e))?;
                debug!(bytes = self.inner.size(), "Compressed response finished");
                Ok(())
            }
            Phase::Unset | Phase::Buffering => {
                self.phase = Phase::Finished;
                self.finish_uncompressed()
                    .await
                    .map_err(|e| Error::compression("writing buffer into original writer", e))?;
                debug!(bytes = self.inner.size(), "Response sent uncompressed");
                Ok(())
            }
        }
    }

    fn into_inner(self: Box<Self>) -> Option<Box<dyn ResponseWriter>> {
        Some(self.inner)
    }
}

impl fmt::Debug for GzipWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GzipWriter")
            .field("phase", &self.phase)
            .field("buffered", &self.buffer.len())
            .field("min_length", &self.min_length)
            .field("inner", &self.inner)
            .finish()
    }
}
