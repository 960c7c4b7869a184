//! Demo routes served by `zipline serve`

use anyhow::Result;
use zipline_core::{async_trait, header, Context, Engine, Error, Handler, HeaderValue, Method};
use zipline_core::{Router, StatusCode};
use zipline_gzip::{Gzip, GzipConfig};

const DEFAULT_SIZE: usize = 4096;
const MAX_SIZE: usize = 16 * 1024 * 1024;
const WRITE_CHUNK: usize = 8 * 1024;
const FILLER: &[u8] = b"zipline streams this text through the gzip middleware. ";

/// Demo engine, with the gzip middleware installed when enabled
pub(crate) fn engine(config: &GzipConfig) -> Result<Engine> {
    let mut builder = Engine::builder();

    if config.enabled {
        let gzip = Gzip::from_config(config)?;
        tracing::info!(
            level = %config.level,
            min_length = config.min_length,
            decompress_requests = config.decompress_requests,
            "Gzip middleware enabled"
        );
        builder = builder.middleware(gzip);
    }

    Ok(builder.handler(router()).build())
}

fn router() -> Router {
    Router::new()
        .route(Method::GET, "/", Text)
        .route(Method::POST, "/echo", Echo)
}

/// `GET /?size=N`: N bytes of text, written in chunks
#[derive(Debug)]
struct Text;

#[async_trait]
impl Handler for Text {
    async fn handle(&self, ctx: &mut Context) -> zipline_core::Result<()> {
        let size = requested_size(ctx.request().uri().query())?;

        ctx.status(StatusCode::OK);
        ctx.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );

        let mut remaining = size;
        let mut chunk = Vec::with_capacity(WRITE_CHUNK.min(size));
        while remaining > 0 {
            chunk.clear();
            let want = remaining.min(WRITE_CHUNK);
            while chunk.len() < want {
                let take = (want - chunk.len()).min(FILLER.len());
                chunk.extend_from_slice(&FILLER[..take]);
            }
            ctx.writer_mut().write(&chunk).await?;
            remaining -= want;
        }

        Ok(())
    }
}

/// `POST /echo`: the (decoded) request body, sent back as received
#[derive(Debug)]
struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, ctx: &mut Context) -> zipline_core::Result<()> {
        let content_type = ctx
            .request()
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
        let data = ctx.body_bytes().await?;

        tracing::debug!(bytes = data.len(), "Echoing request body");

        ctx.status(StatusCode::OK);
        ctx.set_header(header::CONTENT_TYPE, content_type);
        ctx.writer_mut().write(&data).await?;
        Ok(())
    }
}

fn requested_size(query: Option<&str>) -> zipline_core::Result<usize> {
    let raw = query
        .into_iter()
        .flat_map(|q| q.split('&'))
        .find_map(|pair| pair.strip_prefix("size="));

    let Some(raw) = raw else {
        return Ok(DEFAULT_SIZE);
    };

    let size: usize = raw
        .parse()
        .map_err(|_| Error::InvalidRequest(format!("size must be a number, got '{raw}'")))?;
    if size > MAX_SIZE {
        return Err(Error::InvalidRequest(format!(
            "size {size} exceeds the maximum of {MAX_SIZE}"
        )));
    }
    Ok(size)
}
