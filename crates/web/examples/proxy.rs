//! Forwards `/api/*` to an upstream through a client that answers in process.
//!
//! A real deployment plugs an HTTP client implementation in place of `LoopbackClient`.

use async_trait::async_trait;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use strand_web::proxy::{ClientError, ClientRequest, ClientResponse, HttpClient, ProxyDescriptor, ProxyForwarder, RedirectFollower};
use strand_web::server::{Server, ServerConfig};
use strand_web::{BoxError, Request, Response, handler_fn};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use url::Url;

struct LoopbackClient;

#[async_trait]
impl HttpClient for LoopbackClient {
    async fn request(&self, request: ClientRequest) -> Result<ClientResponse, ClientError> {
        info!(method = %request.effective_method(), url = %request.url, "upstream request");
        let mut response = ClientResponse::new(StatusCode::OK);
        response.headers.insert(CONTENT_TYPE, http::HeaderValue::from_static("text/plain"));
        response.body = Some(format!("upstream saw {}", request.url).into());
        Ok(response)
    }
}

async fn forward_api(forwarder: ProxyForwarder, request: Request) -> Result<Option<Response>, BoxError> {
    let Some(path) = request.url().path().strip_prefix("/api") else {
        return Ok(None);
    };
    let target = Url::parse("http://upstream.internal/")?.join(path.trim_start_matches('/'))?;
    let descriptor = ProxyDescriptor::new(target, request)
        .forward_method(true)
        .forward_query_params(true)
        .forward_headers(vec!["accept", "accept-language"])
        .forward_body(true)
        .forward_response_headers(vec!["content-type"]);
    Ok(Some(forwarder.forward(descriptor).await?))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let forwarder = ProxyForwarder::new(RedirectFollower::new(LoopbackClient));
    let handler = handler_fn(move |request: Request| forward_api(forwarder.clone(), request));

    let config = ServerConfig { listen_http_port: 3000, listen_https_port: 0, ..ServerConfig::default() };
    if let Err(e) = Server::builder().config(config).build().run(handler).await {
        error!(cause = %e, "server error");
    }
}
