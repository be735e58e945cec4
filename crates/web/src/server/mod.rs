//! Listener lifecycle.
//!
//! [`Server`] binds the HTTP and HTTPS listeners a [`ServerConfig`] asks for, serves every
//! connection through one [`Pipeline`], and registers each listener's close task with a
//! [`ShutdownCoordinator`]. Without a coordinator it listens for SIGINT and SIGTERM itself.

mod config;
mod date;
mod listener;
mod pipeline;
mod shutdown;
mod tls;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

pub use config::ConfigError;
pub use config::ServerConfig;
pub use listener::RunningListener;
pub use pipeline::Pipeline;
pub use shutdown::ShutdownCoordinator;
pub use shutdown::ShutdownHandler;
pub use shutdown::ShutdownTask;
pub use tls::TlsError;

use crate::handler::RequestHandler;
use listener::Listener;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("config error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("tls error: {source}")]
    Tls {
        #[from]
        source: TlsError,
    },

    #[error("can't bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

pub struct ServerBuilder {
    config: ServerConfig,
    coordinator: Option<Arc<dyn ShutdownCoordinator>>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("config", &self.config).finish_non_exhaustive()
    }
}

impl ServerBuilder {
    fn new() -> Self {
        Self { config: ServerConfig::default(), coordinator: None }
    }

    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Listener close tasks go to `coordinator` instead of a signal listening [`ShutdownHandler`].
    #[must_use]
    pub fn shutdown_coordinator(mut self, coordinator: Arc<dyn ShutdownCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn build(self) -> Server {
        Server { config: self.config, coordinator: self.coordinator }
    }
}

pub struct Server {
    config: ServerConfig,
    coordinator: Option<Arc<dyn ShutdownCoordinator>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server").field("config", &self.config).finish_non_exhaustive()
    }
}

/// The listeners of a started [`Server`].
#[derive(Debug)]
pub struct RunningServer {
    http: Option<RunningListener>,
    https: Option<RunningListener>,
}

impl RunningServer {
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().map(RunningListener::local_addr)
    }

    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.https.as_ref().map(RunningListener::local_addr)
    }

    /// Resolves once every listener was shut down and drained.
    pub async fn closed(self) {
        for listener in [self.https, self.http].into_iter().flatten() {
            listener.closed().await;
        }
        info!("server stopped");
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Serves until the listeners are shut down.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    pub async fn run<H: RequestHandler + 'static>(self, handler: H) -> Result<(), ServerError> {
        self.start(handler).await?.closed().await;
        Ok(())
    }

    /// Binds the enabled listeners and starts serving.
    ///
    /// # Errors
    ///
    /// An invalid config, unusable TLS material, or a socket that can't be bound.
    pub async fn start<H: RequestHandler + 'static>(self, handler: H) -> Result<RunningServer, ServerError> {
        let config = self.config;
        config.validate()?;

        if config.https_dhparam.is_some() {
            warn!("https_dhparam is ignored, only ECDHE key exchange is negotiated");
        }
        if config.listen_https_port != 0 && config.https_certificate.is_some() != config.https_key.is_some() {
            warn!("https needs both a certificate and a key, not listening for https");
        }

        let pipeline = Arc::new(Pipeline::new(Arc::new(handler), &config));
        let interface = config.interface();

        // both sockets are bound before either accepts, a failed bind drops the other unserved
        let https = match config.https_material() {
            Some((certificate, key)) => {
                let tls_acceptor = tls::tls_acceptor(certificate, key)?;
                Some(Listener::bind(SocketAddr::new(interface, config.listen_https_port), Some(tls_acceptor)).await?)
            }
            None => None,
        };
        let http = if config.http_enabled() {
            Some(Listener::bind(SocketAddr::new(interface, config.listen_http_port), None).await?)
        } else {
            None
        };

        let https = https.map(|listener| listener.spawn(Arc::clone(&pipeline)));
        let http = http.map(|listener| listener.spawn(Arc::clone(&pipeline)));

        if https.is_none() && http.is_none() {
            warn!("no listener is enabled");
        }

        let coordinator: Arc<dyn ShutdownCoordinator> = match self.coordinator {
            Some(coordinator) => coordinator,
            None => {
                let shutdown_handler = Arc::new(ShutdownHandler::new());
                let signal_handler = Arc::clone(&shutdown_handler);
                tokio::spawn(async move { signal_handler.listen_for_signals().await });
                shutdown_handler
            }
        };
        for listener in [&https, &http].into_iter().flatten() {
            coordinator.add_task(listener.close_task());
        }

        Ok(RunningServer { http, https })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BoxError;
    use crate::handler::handler_fn;
    use crate::request::Request;
    use crate::response::Response;
    use http::StatusCode;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn ok(_request: Request) -> Result<Option<Response>, BoxError> {
        Ok(Some(Response::text("ok", StatusCode::OK)))
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn coordinated_shutdown() {
        let config = ServerConfig {
            listen_interface: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            listen_http_port: free_port(),
            listen_https_port: 0,
            ..ServerConfig::default()
        };
        let shutdown_handler = Arc::new(ShutdownHandler::new());
        let server = Server::builder()
            .config(config)
            .shutdown_coordinator(Arc::clone(&shutdown_handler) as Arc<dyn ShutdownCoordinator>)
            .build();

        let running = server.start(handler_fn(ok)).await.unwrap();
        let address = running.http_addr().unwrap();
        assert!(running.https_addr().is_none());

        let mut stream = TcpStream::connect(address).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.ends_with("\r\n\r\nok"));

        shutdown_handler.shutdown().await;
        running.closed().await;
        assert!(TcpStream::connect(address).await.is_err());
    }

    #[tokio::test]
    async fn failed_http_bind_releases_https_port() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let https_port = free_port();
        let config = ServerConfig {
            listen_interface: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            listen_http_port: taken.local_addr().unwrap().port(),
            listen_https_port: https_port,
            https_certificate: Some(include_str!("../../tests/data/localhost.crt").to_owned()),
            https_key: Some(include_str!("../../tests/data/localhost.key").to_owned()),
            ..ServerConfig::default()
        };

        let result = Server::builder()
            .config(config)
            .shutdown_coordinator(Arc::new(ShutdownHandler::new()))
            .build()
            .start(handler_fn(ok))
            .await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
        assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, https_port)).await.is_err());
        std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, https_port)).unwrap();
    }

    #[tokio::test]
    async fn invalid_config() {
        let config = ServerConfig { redirect_http_to_https_status_code: 404, ..ServerConfig::default() };
        let result = Server::builder().config(config).build().start(handler_fn(ok)).await;
        assert!(matches!(result, Err(ServerError::Config { .. })));
    }

    #[tokio::test]
    async fn invalid_tls_material() {
        let config = ServerConfig {
            listen_http_port: 0,
            https_certificate: Some("not a pem".to_owned()),
            https_key: Some("not a pem".to_owned()),
            ..ServerConfig::default()
        };
        let result = Server::builder()
            .config(config)
            .shutdown_coordinator(Arc::new(ShutdownHandler::new()))
            .build()
            .start(handler_fn(ok))
            .await;
        assert!(matches!(result, Err(ServerError::Tls { .. })));
    }
}
