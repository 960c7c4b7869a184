// Performance benchmarks for the gzip middleware
//
// Run with: cargo bench -p zipline-gzip --bench gzip_benchmarks

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::runtime::Runtime;
use zipline_core::body;
use zipline_core::{Context, Engine, Handler};
use zipline_gzip::{CompressionLevel, CompressorPool, Gzip};

// Handler writing a fixed payload
#[derive(Debug, Clone)]
struct Payload(Bytes);

#[zipline_core::async_trait]
impl Handler for Payload {
    async fn handle(&self, ctx: &mut Context) -> zipline_core::Result<()> {
        ctx.data(StatusCode::OK, "text/plain", &self.0).await?;
        Ok(())
    }
}

fn payload(size: usize) -> Bytes {
    "Gzip benchmark payload, fairly repetitive text. "
        .repeat(size / 48 + 1)
        .into_bytes()
        .into_iter()
        .take(size)
        .collect::<Vec<u8>>()
        .into()
}

fn request(gzip: bool) -> Request<body::Body> {
    let mut builder = Request::builder().uri("/");
    if gzip {
        builder = builder.header("Accept-Encoding", "gzip");
    }
    builder.body(body::empty()).unwrap()
}

fn benchmark_engine(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("engine");

    // Test different payload sizes
    for size in [512, 10240, 102400].iter() {
        group.throughput(Throughput::Bytes(*size as u64));

        let compressed = Engine::builder()
            .middleware(Gzip::builder().min_length(1024).build().unwrap())
            .handler(Payload(payload(*size)))
            .build();
        let plain = Engine::builder().handler(Payload(payload(*size))).build();

        group.bench_with_input(BenchmarkId::new("gzip", size), size, |b, _| {
            b.to_async(&rt).iter(|| {
                let engine = compressed.clone();
                async move {
                    let response = engine.handle(request(true)).await;
                    black_box(response.into_body().collect().await.unwrap().to_bytes())
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("plain", size), size, |b, _| {
            b.to_async(&rt).iter(|| {
                let engine = plain.clone();
                async move {
                    let response = engine.handle(request(false)).await;
                    black_box(response.into_body().collect().await.unwrap().to_bytes())
                }
            });
        });
    }

    group.finish();
}

fn benchmark_compressor(c: &mut Criterion) {
    let data = payload(102400);

    let mut group = c.benchmark_group("compressor");
    group.throughput(Throughput::Bytes(data.len() as u64));

    let levels = [
        CompressionLevel::BEST_SPEED,
        CompressionLevel::DEFAULT,
        CompressionLevel::BEST_COMPRESSION,
    ];
    for level in levels {
        let pool = Arc::new(CompressorPool::new(level, 4));

        group.bench_with_input(BenchmarkId::from_parameter(level), &data, |b, data| {
            b.iter(|| {
                let mut compressor = pool.checkout();
                compressor.write(data).unwrap();
                compressor.finish().unwrap();
                black_box(compressor.take_output())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_engine, benchmark_compressor);
criterion_main!(benches);
