//! End-to-end behaviour of the gzip middleware inside an engine

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, VARY};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use std::io::{Read, Write};
use zipline_core::body::{self, Body};
use zipline_core::{handler_fn, Engine, Router};
use zipline_gzip::{CompressionLevel, Gzip, GzipDecompressor};

const TEST_RESPONSE: &str = "Gzip Test Response ";
const TEST_REVERSE_RESPONSE: &str = "Gzip Test Reverse Response ";

handler_fn!(Index, |ctx| {
    ctx.set_header(CONTENT_LENGTH, HeaderValue::from(TEST_RESPONSE.len()));
    ctx.string(StatusCode::OK, TEST_RESPONSE).await?;
    Ok(())
});

handler_fn!(MinLengthBuffer, |ctx| {
    ctx.string(StatusCode::OK, TEST_RESPONSE).await?;
    ctx.string(StatusCode::OK, TEST_RESPONSE).await?;
    Ok(())
});

// Relays an upstream body the way a proxy would: raw writes, no content type.
handler_fn!(Reverse, |ctx| {
    for part in TEST_REVERSE_RESPONSE.split_inclusive(' ') {
        ctx.writer_mut().write(part.as_bytes()).await?;
    }
    Ok(())
});

handler_fn!(Stream, |ctx| {
    ctx.status(StatusCode::OK);
    for i in 0..64 {
        let line = format!("line {:04} of a streamed response body\n", i);
        ctx.writer_mut().write(line.as_bytes()).await?;
        if i % 16 == 15 {
            ctx.writer_mut().flush().await?;
        }
    }
    Ok(())
});

handler_fn!(Echo, |ctx| {
    if ctx.header(CONTENT_ENCODING).is_some() {
        return Err(zipline_core::Error::Internal("unexpected Content-Encoding".into()));
    }
    if ctx.header(CONTENT_LENGTH).is_some() {
        return Err(zipline_core::Error::Internal("unexpected Content-Length".into()));
    }
    let data = ctx.body_bytes().await?;
    ctx.data(StatusCode::OK, "text/plain", &data).await?;
    Ok(())
});

handler_fn!(Plain, |ctx| {
    ctx.string(StatusCode::OK, "ok").await?;
    Ok(())
});

fn server(min_length: usize) -> Engine {
    let gzip = Gzip::builder()
        .level(CompressionLevel::DEFAULT)
        .min_length(min_length)
        .build()
        .unwrap();

    Engine::builder()
        .middleware(gzip)
        .handler(
            Router::new()
                .route(Method::GET, "/", Index)
                .route(Method::GET, "/minlengthbuffer", MinLengthBuffer)
                .any("/reverse", Reverse)
                .route(Method::GET, "/stream", Stream),
        )
        .build()
}

fn get(path: &str, gzip: bool) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if gzip {
        builder = builder.header(ACCEPT_ENCODING, "gzip");
    }
    builder.body(body::empty()).unwrap()
}

async fn read(response: Response<Body>) -> (http::response::Parts, Bytes) {
    let (parts, body) = response.into_parts();
    (parts, body.collect().await.unwrap().to_bytes())
}

fn header<'a>(parts: &'a http::response::Parts, name: http::header::HeaderName) -> &'a str {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn gunzip(data: &[u8]) -> String {
    let mut out = String::new();
    GzDecoder::new(data).read_to_string(&mut out).unwrap();
    out
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[tokio::test]
async fn test_gzip() {
    let (parts, body) = read(server(0).handle(get("/", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "gzip");
    assert_eq!(header(&parts, VARY), "Accept-Encoding");
    assert_ne!(header(&parts, CONTENT_LENGTH), "0");
    assert_ne!(body.len(), TEST_RESPONSE.len());
    assert_eq!(header(&parts, CONTENT_LENGTH), body.len().to_string());
    assert_eq!(gunzip(&body), TEST_RESPONSE);
}

#[tokio::test]
async fn test_gzip_png() {
    handler_fn!(Png, |ctx| {
        ctx.string(StatusCode::OK, "this is a PNG!").await?;
        Ok(())
    });

    let engine = Engine::builder()
        .middleware(Gzip::new(CompressionLevel::DEFAULT))
        .handler(Router::new().route(Method::GET, "/image.png", Png))
        .build();
    let (parts, body) = read(engine.handle(get("/image.png", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(header(&parts, VARY), "");
    assert_eq!(&body[..], b"this is a PNG!");
}

#[tokio::test]
async fn test_excluded_extensions() {
    handler_fn!(Html, |ctx| {
        ctx.string(StatusCode::OK, "this is a HTML!").await?;
        Ok(())
    });

    let gzip = Gzip::builder()
        .excluded_extensions([".html"])
        .build()
        .unwrap();
    let engine = Engine::builder()
        .middleware(gzip)
        .handler(Router::new().route(Method::GET, "/index.html", Html))
        .build();
    let (parts, body) = read(engine.handle(get("/index.html", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(header(&parts, VARY), "");
    assert_eq!(header(&parts, CONTENT_LENGTH), "");
    assert_eq!(&body[..], b"this is a HTML!");
}

#[tokio::test]
async fn test_excluded_paths() {
    handler_fn!(Books, |ctx| {
        ctx.string(StatusCode::OK, "this is books!").await?;
        Ok(())
    });

    let gzip = Gzip::builder().excluded_paths(["/api/"]).build().unwrap();
    let engine = Engine::builder()
        .middleware(gzip)
        .handler(Router::new().route(Method::GET, "/api/books", Books))
        .build();
    let (parts, body) = read(engine.handle(get("/api/books", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(header(&parts, VARY), "");
    assert_eq!(header(&parts, CONTENT_LENGTH), "");
    assert_eq!(&body[..], b"this is books!");
}

#[tokio::test]
async fn test_excluded_path_regexes() {
    handler_fn!(Svg, |ctx| {
        ctx.data(StatusCode::OK, "image/svg+xml", b"<svg></svg>").await?;
        Ok(())
    });

    let gzip = Gzip::builder()
        .excluded_path_regexes([r".*\.svg$"])
        .build()
        .unwrap();
    let engine = Engine::builder()
        .middleware(gzip)
        .handler(Router::new().route(Method::GET, "/icons/logo.svg", Svg))
        .build();
    let (parts, body) = read(engine.handle(get("/icons/logo.svg", true)).await).await;

    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(&body[..], b"<svg></svg>");
}

#[tokio::test]
async fn test_no_gzip() {
    let (parts, body) = read(server(0).handle(get("/", false)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(header(&parts, CONTENT_LENGTH), "19");
    assert_eq!(&body[..], TEST_RESPONSE.as_bytes());
}

#[tokio::test]
async fn test_gzip_with_reverse_proxy() {
    let (parts, body) = read(server(0).handle(get("/reverse", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "gzip");
    assert_eq!(header(&parts, VARY), "Accept-Encoding");
    assert_eq!(header(&parts, CONTENT_LENGTH), body.len().to_string());
    assert_eq!(gunzip(&body), TEST_REVERSE_RESPONSE);
}

#[tokio::test]
async fn test_streamed_response_with_flushes() {
    let (parts, body) = read(server(0).handle(get("/stream", true)).await).await;

    assert_eq!(header(&parts, CONTENT_ENCODING), "gzip");
    // The head went out with the first flush, before the length was known.
    assert_eq!(header(&parts, CONTENT_LENGTH), "");

    let text = gunzip(&body);
    assert_eq!(text.lines().count(), 64);
    assert!(text.starts_with("line 0000"));
    assert!(text.ends_with("line 0063 of a streamed response body\n"));
}

#[tokio::test]
async fn test_decompress_gzip() {
    let engine = Engine::builder()
        .middleware(
            Gzip::builder()
                .decompressor(GzipDecompressor)
                .build()
                .unwrap(),
        )
        .handler(Router::new().route(Method::POST, "/", Echo))
        .build();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_ENCODING, "gzip")
        .body(body::full(gzip(TEST_RESPONSE.as_bytes())))
        .unwrap();
    let (parts, body) = read(engine.handle(req).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(header(&parts, VARY), "");
    assert_eq!(header(&parts, CONTENT_LENGTH), "");
    assert_eq!(&body[..], TEST_RESPONSE.as_bytes());
}

#[tokio::test]
async fn test_decompress_gzip_with_empty_body() {
    let engine = Engine::builder()
        .middleware(
            Gzip::builder()
                .decompressor(GzipDecompressor)
                .build()
                .unwrap(),
        )
        .handler(Router::new().route(Method::POST, "/", Plain))
        .build();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_ENCODING, "gzip")
        .body(body::empty())
        .unwrap();
    let (parts, body) = read(engine.handle(req).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "");
    assert_eq!(header(&parts, VARY), "");
    assert_eq!(header(&parts, CONTENT_LENGTH), "");
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_decompress_gzip_with_streamed_empty_body() {
    let engine = Engine::builder()
        .middleware(
            Gzip::builder()
                .decompressor(GzipDecompressor)
                .build()
                .unwrap(),
        )
        .handler(Router::new().route(Method::POST, "/", Plain))
        .build();

    // Chunked transfer with no chunks: only known to be empty once polled.
    let frames = futures::stream::empty::<Result<http_body::Frame<Bytes>, std::io::Error>>();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_ENCODING, "gzip")
        .body(body::boxed(http_body_util::StreamBody::new(frames)))
        .unwrap();
    let (parts, body) = read(engine.handle(req).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn test_decompress_gzip_with_incorrect_data() {
    handler_fn!(MustNotRun, |_ctx| {
        panic!("handler ran for a malformed body");
    });

    let engine = Engine::builder()
        .middleware(
            Gzip::builder()
                .decompressor(GzipDecompressor)
                .build()
                .unwrap(),
        )
        .handler(MustNotRun)
        .build();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(CONTENT_ENCODING, "gzip")
        .body(body::full(TEST_RESPONSE))
        .unwrap();
    let response = engine.handle(req).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gzip_min_length_buffer() {
    let (parts, body) =
        read(server(TEST_RESPONSE.len() + 1).handle(get("/minlengthbuffer", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(header(&parts, CONTENT_ENCODING), "gzip");
    assert_eq!(header(&parts, VARY), "Accept-Encoding");
    assert_ne!(body.len(), 2 * TEST_RESPONSE.len());
    assert_eq!(header(&parts, CONTENT_LENGTH), body.len().to_string());
    assert_eq!(gunzip(&body), TEST_RESPONSE.repeat(2));
}

#[tokio::test]
async fn test_gzip_min_length_no_buffer() {
    let (parts, body) = read(server(100).handle(get("/", true)).await).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_ne!(header(&parts, CONTENT_ENCODING), "gzip");
    assert_ne!(header(&parts, VARY), "Accept-Encoding");
    assert_eq!(body.len(), TEST_RESPONSE.len());
    assert_eq!(header(&parts, CONTENT_LENGTH), body.len().to_string());
    assert_eq!(&body[..], TEST_RESPONSE.as_bytes());
}

#[tokio::test]
async fn test_compressor_returned_to_pool() {
    let gzip = Gzip::new(CompressionLevel::BEST_SPEED);
    let pool = gzip.pool().clone();
    let engine = Engine::builder()
        .middleware(gzip)
        .handler(Router::new().route(Method::GET, "/", Index))
        .build();

    for _ in 0..3 {
        let (_, body) = read(engine.handle(get("/", true)).await).await;
        assert_eq!(gunzip(&body), TEST_RESPONSE);
    }
    assert_eq!(pool.idle(), 1);
}
