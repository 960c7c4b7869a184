//! HTTP/1 listener driving an [`Engine`]

use anyhow::{Context as _, Result};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use zipline_core::body;
use zipline_core::{Engine, Request};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Accept connections until SIGINT/SIGTERM, then drain open connections
pub(crate) async fn run(listen: SocketAddr, engine: Engine) -> Result<()> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind to {listen}"))?;

    tracing::info!(listen = %listener.local_addr()?, "Server listening");

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        tracing::trace!("Accepted connection from {}", addr);
                        tracker.spawn(serve_connection(
                            TokioIo::new(stream),
                            engine.clone(),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                    }
                }
            }

            _ = &mut signal => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    shutdown.cancel();
    tracker.close();

    tracing::info!(connections = tracker.len(), "Draining connections");
    if tokio::time::timeout(DRAIN_TIMEOUT, tracker.wait()).await.is_err() {
        tracing::warn!(
            remaining = tracker.len(),
            "Drain timeout elapsed, dropping open connections"
        );
    }

    Ok(())
}

async fn serve_connection(
    io: TokioIo<tokio::net::TcpStream>,
    engine: Engine,
    shutdown: CancellationToken,
) {
    let service = service_fn(move |req: Request<Incoming>| {
        let engine = engine.clone();
        async move { Ok::<_, Infallible>(engine.handle(req.map(body::boxed)).await) }
    });

    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!("HTTP connection error: {}", e);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
