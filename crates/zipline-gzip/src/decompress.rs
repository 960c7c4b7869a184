//! Inbound request decompression

use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::{StreamExt, TryStreamExt};
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use http_body::{Body as _, Frame};
use http_body_util::{BodyExt, StreamBody};
use std::fmt;
use std::io;
use tokio::io::AsyncReadExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;
use zipline_core::body::{self, BoxError};
use zipline_core::{Context, Error, Result};

/// Size of the first decoded read used to validate the stream
const PRIME_CAPACITY: usize = 8 * 1024;

/// Replaces an encoded request body with its decoded form
#[async_trait]
pub trait Decompressor: Send + Sync + fmt::Debug {
    /// Decode the body of `ctx`'s request in place
    ///
    /// An `Err` ends the request before the handler runs.
    async fn decompress(&self, ctx: &mut Context) -> Result<()>;
}

/// Streaming gzip request decoder
///
/// Concatenated gzip members decode as one body. The first read happens up front, so a
/// body that is not gzip at all fails with [`Error::MalformedBody`] (400) before the
/// handler sees it; corruption further in surfaces when the handler reads the body.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipDecompressor;

#[async_trait]
impl Decompressor for GzipDecompressor {
    async fn decompress(&self, ctx: &mut Context) -> Result<()> {
        if ctx.request().body().is_end_stream() {
            return Ok(());
        }

        // Streamed bodies may only reveal they are empty once read.
        let mut data = ctx.take_body().into_data_stream();
        let first = loop {
            match data.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => continue,
                Some(Ok(chunk)) => break chunk,
                Some(Err(e)) => return Err(Error::Body(e.to_string())),
                None => {
                    ctx.set_body(body::empty());
                    return Ok(());
                }
            }
        };

        let data = futures::stream::iter(Some(Ok::<_, BoxError>(first)))
            .chain(data)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let mut decoder = GzipDecoder::new(StreamReader::new(data));
        decoder.multiple_members(true);

        let mut head = BytesMut::with_capacity(PRIME_CAPACITY);
        decoder
            .read_buf(&mut head)
            .await
            .map_err(Error::MalformedBody)?;

        debug!(primed = head.len(), "Decompressing gzip request body");

        let primed = (!head.is_empty()).then(|| Ok(head.freeze()));
        let frames = futures::stream::iter(primed)
            .chain(ReaderStream::new(decoder))
            .map_ok(Frame::data);
        ctx.set_body(body::boxed(StreamBody::new(frames)));

        let headers = ctx.request_mut().headers_mut();
        headers.remove(CONTENT_ENCODING);
        headers.remove(CONTENT_LENGTH);
        Ok(())
    }
}
