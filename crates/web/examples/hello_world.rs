use http::{Method, StatusCode};
use strand_web::cookie::CookieDirective;
use strand_web::server::{Server, ServerConfig};
use strand_web::{BoxError, Request, Response, handler_fn, validate_methods};
use tracing::{Level, error};
use tracing_subscriber::FmtSubscriber;

async fn hello_world(request: Request) -> Result<Option<Response>, BoxError> {
    if request.url().path() != "/" {
        return Ok(None);
    }
    if let Some(response) = validate_methods(&request, &[Method::GET, Method::HEAD, Method::OPTIONS]) {
        return Ok(Some(response));
    }

    let visits = request.cookie("visits").and_then(|visits| visits.parse::<u32>().ok()).unwrap_or(0) + 1;
    let response = Response::builder()
        .status(StatusCode::OK)
        .cookie("visits", CookieDirective::set(visits.to_string()))
        .body(format!("hello world, visit {visits}").into())
        .build();
    Ok(Some(response))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = ServerConfig { listen_http_port: 3000, listen_https_port: 0, ..ServerConfig::default() };
    if let Err(e) = Server::builder().config(config).build().run(handler_fn(hello_world)).await {
        error!(cause = %e, "server error");
    }
}
