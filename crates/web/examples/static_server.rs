//! Serves a directory, configured from an optional TOML file:
//!
//! ```text
//! cargo run --example static_server -- ./public server.toml
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use http::Method;
use strand_web::server::{Server, ServerConfig};
use strand_web::static_file::StaticFileResponder;
use strand_web::{BoxError, Request, RequestHandler, Response, validate_methods};
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

struct StaticFiles {
    root: PathBuf,
    responder: StaticFileResponder,
}

#[async_trait]
impl RequestHandler for StaticFiles {
    async fn handle(&self, request: Request) -> Result<Option<Response>, BoxError> {
        if let Some(response) = validate_methods(&request, &[Method::GET, Method::HEAD]) {
            return Ok(Some(response));
        }

        let path = request.url().path();
        Ok(Some(self.responder.respond_filtered(&self.root, path, &request, None, None).await))
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| ".".to_owned()));
    let config = match args.next() {
        Some(path) => match ServerConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                error!(cause = %e, "can't load config");
                return;
            }
        },
        None => ServerConfig { listen_http_port: 8080, listen_https_port: 0, ..ServerConfig::default() },
    };

    let handler = StaticFiles { root, responder: StaticFileResponder::default() };
    if let Err(e) = Server::builder().config(config).build().run(handler).await {
        error!(cause = %e, "server error");
    }
}
