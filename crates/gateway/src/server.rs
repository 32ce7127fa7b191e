//! Listener lifecycle: bind, serve (plain or TLS) and interrupt handling.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ConnectInfo;
use axum::{Extension, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use scangate_supervisor::{JobSupervisor, ShutdownReport};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::StartupError;

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, StartupError> {
    TcpListener::bind(addr).await.map_err(|err| {
        StartupError::new(
            "ERR_BIND_FAILED",
            format!("failed to bind gateway listener on {}: {}", addr, err),
        )
    })
}

/// Serve until `stop` is cancelled.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    tls: Option<Arc<ServerConfig>>,
    stop: CancellationToken,
) -> Result<()> {
    match tls {
        Some(config) => serve_tls(listener, app, config, stop).await,
        None => axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(stop.cancelled_owned())
        .await
        .context("HTTP server failed"),
    }
}

async fn serve_tls(
    listener: TcpListener,
    app: Router,
    config: Arc<ServerConfig>,
    stop: CancellationToken,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(config);

    loop {
        let (stream, peer) = tokio::select! {
            _ = stop.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "Failed to accept connection");
                    continue;
                }
            },
        };

        let acceptor = acceptor.clone();
        let app = app.clone().layer(Extension(ConnectInfo(peer)));
        let stop = stop.clone();
        tokio::spawn(async move {
            let tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(err) => {
                    debug!(peer = %peer, error = %err, "TLS handshake failed");
                    return;
                }
            };

            let builder = auto::Builder::new(TokioExecutor::new());
            let conn = builder.serve_connection(TokioIo::new(tls), TowerToHyperService::new(app));
            tokio::select! {
                result = conn => {
                    if let Err(err) = result {
                        debug!(peer = %peer, error = %err, "Connection closed with error");
                    }
                }
                _ = stop.cancelled() => {}
            }
        });
    }
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

/// Host the listener on its own task and wait for `interrupt`.
///
/// On interrupt every active job is terminated first, then the listener is
/// stopped. If the listener ends on its own the jobs are terminated as well.
pub async fn run_foreground<F>(
    listener: TcpListener,
    app: Router,
    tls: Option<Arc<ServerConfig>>,
    supervisor: JobSupervisor,
    interrupt: F,
) -> Result<ShutdownReport>
where
    F: Future<Output = ()> + Send,
{
    let stop = CancellationToken::new();
    let mut listener_task = tokio::spawn(serve(listener, app, tls, stop.clone()));

    let finished_early = tokio::select! {
        _ = interrupt => None,
        joined = &mut listener_task => Some(joined),
    };

    let report = supervisor.shutdown().await;
    stop.cancel();

    let joined = match finished_early {
        Some(joined) => {
            warn!("Listener stopped before an interrupt was received");
            joined
        }
        None => listener_task.await,
    };
    joined.context("listener task panicked")??;

    info!(
        signalled = report.signalled,
        forced = report.forced,
        "Gateway stopped"
    );
    Ok(report)
}
