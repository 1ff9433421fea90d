use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::{Config, TlsConfig};
use crate::http::connection::Connection;
use crate::http::router::Router;
use crate::server::context::ServerContext;
use crate::server::tls::load_tls_acceptor;

/// Pause after a failed accept, so a persistent error such as running out of
/// file descriptors does not spin the loop.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound HTTPS socket and the acceptor that performs handshakes on it.
pub struct TlsListener {
    pub listener: TcpListener,
    pub acceptor: TlsAcceptor,
}

/// Accept loop and owner of every connection task.
pub struct Server {
    ctx: Arc<ServerContext>,
}

impl Server {
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            ctx: Arc::new(ServerContext::new(config, router)),
        }
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// On shutdown the listeners are closed, sessions are told to stop after
    /// their current exchange and given `shutdown_grace` to finish. Whatever
    /// is still running after that is aborted.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        tls: Option<TlsListener>,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!(%peer, "Accepted connection");
                        set_nodelay(&socket, peer);
                        sessions.spawn(serve_connection(
                            socket,
                            peer,
                            self.ctx.clone(),
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => accept_failed(e, "plain").await,
                },

                accepted = accept_tls(tls.as_ref()) => match accepted {
                    Ok((socket, peer, acceptor)) => {
                        debug!(%peer, "Accepted TLS connection");
                        set_nodelay(&socket, peer);
                        sessions.spawn(serve_tls_connection(
                            acceptor,
                            socket,
                            peer,
                            self.ctx.clone(),
                            stop_rx.clone(),
                        ));
                    }
                    Err(e) => accept_failed(e, "tls").await,
                },

                Some(joined) = sessions.join_next(), if !sessions.is_empty() => reap(joined),
            }
        }

        drop(listener);
        drop(tls);
        let _ = stop_tx.send(true);

        let grace = self.ctx.config.shutdown_grace;
        let drained = timeout(grace, async {
            while let Some(joined) = sessions.join_next().await {
                reap(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(remaining = sessions.len(), "Grace period elapsed, aborting connections");
            sessions.abort_all();
            while let Some(joined) = sessions.join_next().await {
                reap(joined);
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Runs one session to completion and logs how it ended.
pub async fn serve_connection<S>(
    stream: S,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
    shutdown: watch::Receiver<bool>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut conn = Connection::new(stream, peer, ctx, shutdown);
    match conn.run().await {
        Ok(()) => debug!(%peer, served = conn.served(), "Connection finished"),
        Err(e) if e.is_benign() => debug!(%peer, error = %e, "Connection ended"),
        Err(e) => warn!(%peer, error = %e, "Connection error"),
    }
}

async fn serve_tls_connection(
    acceptor: TlsAcceptor,
    socket: TcpStream,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
    shutdown: watch::Receiver<bool>,
) {
    let stream = match timeout(ctx.config.read_timeout, acceptor.accept(socket)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!(%peer, error = %e, "TLS handshake failed");
            return;
        }
        Err(_) => {
            debug!(%peer, "TLS handshake timed out");
            return;
        }
    };

    serve_connection(stream, peer, ctx, shutdown).await;
}

/// Accepts on the HTTPS listener; never resolves when there is none.
async fn accept_tls(
    tls: Option<&TlsListener>,
) -> io::Result<(TcpStream, SocketAddr, TlsAcceptor)> {
    match tls {
        Some(tls) => {
            let (socket, peer) = tls.listener.accept().await?;
            Ok((socket, peer, tls.acceptor.clone()))
        }
        None => std::future::pending().await,
    }
}

/// Logs a failed accept and backs off before the next one.
pub async fn accept_failed(e: io::Error, listener: &str) {
    warn!(error = %e, listener, "Failed to accept connection");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

fn set_nodelay(socket: &TcpStream, peer: SocketAddr) {
    if let Err(e) = socket.set_nodelay(true) {
        debug!(%peer, error = %e, "Failed to set TCP_NODELAY");
    }
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "Connection task panicked");
        }
    }
}

/// Binds the configured listeners and serves `router` until Ctrl-C.
///
/// A broken TLS setup disables HTTPS with a warning; the plain listener
/// failing to bind is an error.
pub async fn run(cfg: &Config, router: Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    let tls = match &cfg.tls {
        Some(tls_cfg) => bind_tls(tls_cfg).await,
        None => None,
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    Server::new(cfg.clone(), router)
        .serve(listener, tls, shutdown)
        .await
}

async fn bind_tls(cfg: &TlsConfig) -> Option<TlsListener> {
    let acceptor = match load_tls_acceptor(&cfg.cert_path, &cfg.key_path) {
        Ok(acceptor) => acceptor,
        Err(e) => {
            warn!("HTTPS disabled: {:#}", e);
            return None;
        }
    };

    match TcpListener::bind(&cfg.listen_addr).await {
        Ok(listener) => {
            info!("Listening for HTTPS on {}", cfg.listen_addr);
            Some(TlsListener { listener, acceptor })
        }
        Err(e) => {
            warn!("HTTPS disabled, failed to bind {}: {}", cfg.listen_addr, e);
            None
        }
    }
}
