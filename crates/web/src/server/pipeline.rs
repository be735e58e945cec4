use std::any::Any;
use std::fmt::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::header::{DATE, REFERRER_POLICY};
use http::{HeaderMap, HeaderValue, StatusCode};
use strand_http::connection::{ConnectionInfo, RawConnection};
use strand_http::protocol::ParseError;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

use crate::handler::RequestHandler;
use crate::mapper::{RequestMapper, ResponseMapper};
use crate::request::Request;
use crate::response::Response;
use crate::server::config::{DEFAULT_HTTPS_PORT, ServerConfig};
use crate::server::date::DateService;

#[derive(Debug, Clone, Copy)]
struct HttpsRedirect {
    port: u16,
    status: StatusCode,
}

/// Serves one request per connection: map it, redirect or hand it to the handler, write
/// the response back.
pub struct Pipeline {
    handler: Arc<dyn RequestHandler>,
    request_mapper: RequestMapper,
    response_mapper: ResponseMapper,
    https_redirect: Option<HttpsRedirect>,
    date: Option<DateService>,
    no_referrer: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("request_mapper", &self.request_mapper)
            .field("https_redirect", &self.https_redirect)
            .field("date", &self.date.is_some())
            .field("no_referrer", &self.no_referrer)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Builds the pipeline for `config`.
    ///
    /// # Panics
    ///
    /// Outside a tokio runtime when the `Date` header is enabled, its refresh task is spawned here.
    pub fn new(handler: Arc<dyn RequestHandler>, config: &ServerConfig) -> Self {
        let https_redirect = config
            .redirects_to_https()
            .then(|| config.redirect_status().ok())
            .flatten()
            .map(|status| HttpsRedirect { port: config.redirect_http_to_https_port, status });

        Self {
            handler,
            request_mapper: RequestMapper::new(config.forwarded_headers),
            response_mapper: ResponseMapper::new(),
            https_redirect,
            date: (!config.no_date).then(DateService::new),
            no_referrer: config.no_referrer,
        }
    }

    /// Serves the connection `io` until its response is written.
    pub async fn serve<IO>(&self, io: IO, info: ConnectionInfo)
    where
        IO: AsyncRead + AsyncWrite + Send + Sync + 'static,
    {
        self.serve_until(io, info, &CancellationToken::new()).await;
    }

    /// Like [`serve`](Self::serve), but gives up waiting for the request head on `shutdown`.
    pub(crate) async fn serve_until<IO>(&self, io: IO, info: ConnectionInfo, shutdown: &CancellationToken)
    where
        IO: AsyncRead + AsyncWrite + Send + Sync + 'static,
    {
        let (reader, writer) = tokio::io::split(io);
        let mut connection = RawConnection::new(reader, writer, info);
        self.stage_base_headers(connection.writer_mut().headers_mut());

        let head = tokio::select! {
            () = shutdown.cancelled() => None,
            head = connection.read_head() => Some(head),
        };

        let head = match head {
            Some(Ok(head)) => head,
            None => {
                debug!("shutdown before a request head arrived");
                let (_body, mut writer, _info) = connection.into_parts();
                if let Err(e) = writer.close().await {
                    debug!(cause = %e, "close connection error");
                }
                return;
            }
            Some(Err(ParseError::ConnectionClosed)) => return,
            Some(Err(e)) => {
                warn!(cause = %e, "malformed request head");
                let (_body, writer, _info) = connection.into_parts();
                self.response_mapper.write(invalid_request(), writer, None).await;
                return;
            }
        };

        let method = head.method().clone();
        let (body, writer, info) = connection.into_parts();
        let response = match self.request_mapper.map(head, body, info) {
            Ok(request) => self.respond(request).await,
            Err(e) => {
                warn!(cause = %e, "malformed request");
                invalid_request()
            }
        };

        self.response_mapper.write(response, writer, Some(&method)).await;
    }

    async fn respond(&self, request: Request) -> Response {
        // only plain connections are redirected, a trusted forwarded scheme can still opt out
        if let Some(redirect) = self.https_redirect
            && !request.connection().encrypted
            && request.url().scheme() != "https"
        {
            return match https_location(request.url(), redirect.port) {
                Some(location) => {
                    debug!(%location, "redirect to https");
                    Response::redirect(&location, redirect.status)
                }
                None => invalid_request(),
            };
        }

        match AssertUnwindSafe(self.handler.handle(request)).catch_unwind().await {
            Ok(Ok(Some(response))) => response,
            Ok(Ok(None)) => Response::text("Route not found", StatusCode::NOT_FOUND),
            Ok(Err(e)) => {
                error!(cause = %e, "handler error");
                Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(panic) => {
                error!(cause = panic_message(panic.as_ref()), "handler panicked");
                Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn stage_base_headers(&self, headers: &mut HeaderMap) {
        if let Some(date) = &self.date {
            headers.insert(DATE, date.http_date());
        }
        if self.no_referrer {
            headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
        }
    }
}

fn invalid_request() -> Response {
    Response::text("Invalid request", StatusCode::BAD_REQUEST)
}

/// `https://<host>[:<port>]<path>[?<query>]`, the port omitted when it is the default.
fn https_location(url: &Url, port: u16) -> Option<String> {
    let host = url.host_str()?;
    let mut location = format!("https://{host}");
    if port != DEFAULT_HTTPS_PORT {
        let _ = write!(location, ":{port}");
    }
    location.push_str(url.path());
    if let Some(query) = url.query()
        && !query.is_empty()
    {
        location.push('?');
        location.push_str(query);
    }
    Some(location)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BoxError;
    use crate::handler::handler_fn;
    use indoc::indoc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn echo_path(request: Request) -> Result<Option<Response>, BoxError> {
        match request.url().path() {
            "/missing" => Ok(None),
            "/fail" => Err("boom".into()),
            "/panic" => panic!("handler panic"),
            path => Ok(Some(Response::text(path.to_owned(), StatusCode::OK))),
        }
    }

    async fn exchange(pipeline: Pipeline, request: &str) -> String {
        exchange_over(pipeline, request, ConnectionInfo::plain()).await
    }

    async fn exchange_over(pipeline: Pipeline, request: &str, info: ConnectionInfo) -> String {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        client.write_all(request.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();
        pipeline.serve(server, info).await;

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        response
    }

    fn pipeline(config: &ServerConfig) -> Pipeline {
        Pipeline::new(Arc::new(handler_fn(echo_path)), config)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn handled() {
        let response = exchange(pipeline(&ServerConfig::default()), "GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("referrer-policy: no-referrer\r\n"));
        assert!(!response.contains("date: "));
        assert!(response.ends_with("\r\n\r\n/hello"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn date_header_when_enabled() {
        let config = ServerConfig { no_date: false, no_referrer: false, ..ServerConfig::default() };

        let response = exchange(pipeline(&config), "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.contains("date: "));
        assert!(!response.contains("referrer-policy"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn route_not_found() {
        let response = exchange(pipeline(&ServerConfig::default()), "GET /missing HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("\r\n\r\nRoute not found"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn handler_error_and_panic() {
        for path in ["/fail", "/panic"] {
            let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
            let response = exchange(pipeline(&ServerConfig::default()), &request).await;

            assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{path}: {response}");
            assert!(response.contains("content-length: 0\r\n"));
            assert!(response.ends_with("\r\n\r\n"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn malformed_request() {
        let response = exchange(pipeline(&ServerConfig::default()), "NOT A REQUEST\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.ends_with("\r\n\r\nInvalid request"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn closed_without_request() {
        assert_eq!(exchange(pipeline(&ServerConfig::default()), "").await, "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn head_request() {
        let response = exchange(pipeline(&ServerConfig::default()), "HEAD /abc HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.contains("content-length: 4\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn shutdown_before_head() {
        let (_client, server) = tokio::io::duplex(1024);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        pipeline(&ServerConfig::default()).serve_until(server, ConnectionInfo::plain(), &shutdown).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn post_body_reaches_handler() {
        async fn echo_body(mut request: Request) -> Result<Option<Response>, BoxError> {
            let body = request.take_body().ok_or("no body")?.collect_bytes().await?;
            Ok(Some(Response::builder().body(body.into()).build()))
        }

        let pipeline = Pipeline::new(Arc::new(handler_fn(echo_body)), &ServerConfig::default());
        let request = indoc! {"
            POST /echo HTTP/1.1
            Host: localhost
            Transfer-Encoding: chunked

            5
            hello
            0

        "}
        .replace('\n', "\r\n");

        let response = exchange(pipeline, &request).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\nhello"));
    }

    fn redirecting_config() -> ServerConfig {
        ServerConfig {
            redirect_http_to_https: true,
            forwarded_headers: true,
            https_certificate: Some("certificate".to_owned()),
            https_key: Some("key".to_owned()),
            ..ServerConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn plain_connection_is_redirected() {
        let request = "GET /page HTTP/1.1\r\nHost: example.com\r\n\r\n";

        let response = exchange(pipeline(&redirecting_config()), request).await;

        assert!(response.starts_with("HTTP/1.1 302 Found\r\n"));
        assert!(response.contains("location: https://example.com/page\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn encrypted_connection_is_not_redirected() {
        let request = "GET /page HTTP/1.1\r\nHost: example.com\r\nX-Forwarded-Proto: http\r\n\r\n";

        let response = exchange_over(pipeline(&redirecting_config()), request, ConnectionInfo::encrypted()).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
        assert!(response.ends_with("\r\n\r\n/page"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn forwarded_https_is_not_redirected() {
        let request = "GET /page HTTP/1.1\r\nHost: example.com\r\nX-Forwarded-Proto: https\r\n\r\n";

        let response = exchange(pipeline(&redirecting_config()), request).await;

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    }

    #[test]
    fn location_for_https() {
        let url = Url::parse("http://example.com:8080/a/b?x=1").unwrap();
        assert_eq!(https_location(&url, 443).unwrap(), "https://example.com/a/b?x=1");
        assert_eq!(https_location(&url, 8443).unwrap(), "https://example.com:8443/a/b?x=1");

        let url = Url::parse("http://[::1]/?").unwrap();
        assert_eq!(https_location(&url, 443).unwrap(), "https://[::1]/");
    }
}
