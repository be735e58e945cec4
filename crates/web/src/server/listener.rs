use std::net::SocketAddr;
use std::sync::Arc;

use strand_http::connection::ConnectionInfo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::server::ServerError;
use crate::server::pipeline::Pipeline;
use crate::server::shutdown::ShutdownTask;

/// A bound socket, HTTPS when it has a TLS acceptor.
pub(crate) struct Listener {
    tcp_listener: TcpListener,
    local_addr: SocketAddr,
    tls_acceptor: Option<TlsAcceptor>,
}

impl Listener {
    pub(crate) async fn bind(address: SocketAddr, tls_acceptor: Option<TlsAcceptor>) -> Result<Self, ServerError> {
        let tcp_listener = match TcpListener::bind(address).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, %address, "bind server error");
                return Err(ServerError::Bind { address, source: e });
            }
        };
        let local_addr = tcp_listener.local_addr()?;
        let scheme = if tls_acceptor.is_some() { "https" } else { "http" };
        info!(%local_addr, scheme, "start listening");
        Ok(Self { tcp_listener, local_addr, tls_acceptor })
    }

    /// Starts accepting; every connection is served on its own task.
    pub(crate) fn spawn(self, pipeline: Arc<Pipeline>) -> RunningListener {
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let local_addr = self.local_addr;
        let accept_loop = tokio::spawn(self.accept_loop(pipeline, cancel.clone(), tracker.clone()));
        RunningListener { local_addr, cancel, tracker, accept_loop }
    }

    async fn accept_loop(self, pipeline: Arc<Pipeline>, cancel: CancellationToken, tracker: TaskTracker) {
        loop {
            let (tcp_stream, remote_addr) = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = self.tcp_listener.accept() => match accepted {
                    Ok(stream_and_addr) => stream_and_addr,
                    Err(e) => {
                        warn!(cause = %e, "failed to accept");
                        continue;
                    }
                },
            };

            let info = match &self.tls_acceptor {
                Some(_) => ConnectionInfo::encrypted(),
                None => ConnectionInfo::plain(),
            }
            .with_remote_addr(remote_addr)
            .with_local_addr(self.local_addr);
            let pipeline = Arc::clone(&pipeline);
            let tls_acceptor = self.tls_acceptor.clone();
            let cancel = cancel.clone();

            tracker.spawn(async move {
                match tls_acceptor {
                    Some(tls_acceptor) => match tls_acceptor.accept(tcp_stream).await {
                        Ok(tls_stream) => pipeline.serve_until(tls_stream, info, &cancel).await,
                        Err(e) => warn!(cause = %e, %remote_addr, "tls handshake error"),
                    },
                    None => pipeline.serve_until(tcp_stream, info, &cancel).await,
                }
            });
        }

        tracker.close();
        info!(local_addr = %self.local_addr, "stop listening");
    }
}

/// A listener that is accepting connections.
#[derive(Debug)]
pub struct RunningListener {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    tracker: TaskTracker,
    accept_loop: JoinHandle<()>,
}

impl RunningListener {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, then waits for the connections in flight.
    pub fn close_task(&self) -> ShutdownTask {
        let cancel = self.cancel.clone();
        let tracker = self.tracker.clone();
        Box::pin(async move {
            cancel.cancel();
            tracker.close();
            tracker.wait().await;
        })
    }

    /// Resolves once the listener was closed and its last connection finished.
    pub async fn closed(self) {
        if let Err(e) = self.accept_loop.await {
            error!(cause = %e, "accept loop failed");
            self.tracker.close();
        }
        self.tracker.wait().await;
    }
}
