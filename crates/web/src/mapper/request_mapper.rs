use http::HeaderMap;
use http::header::HOST;
use strand_http::connection::ConnectionInfo;
use strand_http::protocol::{ParseError, ReqBody, RequestHead};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::trace;
use url::Url;

use crate::body::Body;
use crate::request::Request;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";
const FALLBACK_HOST: &str = "localhost";

/// A request that can't be turned into a [`Request`]; answered with 400.
#[derive(Debug, Error)]
pub enum MalformedRequest {
    #[error("malformed request head: {source}")]
    Head {
        #[from]
        source: ParseError,
    },

    #[error("invalid request url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Builds a [`Request`] from what a raw connection decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestMapper {
    trust_forwarded_headers: bool,
}

impl RequestMapper {
    /// `trust_forwarded_headers` lets `X-Forwarded-Proto` and `X-Forwarded-Host` decide the origin.
    pub fn new(trust_forwarded_headers: bool) -> Self {
        Self { trust_forwarded_headers }
    }

    /// Maps a request head and its payload.
    ///
    /// The payload is wrapped, not read: it is consumed only if the handler polls the body.
    ///
    /// # Errors
    ///
    /// [`MalformedRequest::Url`] if the origin and the request target don't form a valid URL.
    pub fn map<R>(&self, head: RequestHead, body: ReqBody<R>, connection: ConnectionInfo) -> Result<Request, MalformedRequest>
    where
        R: AsyncRead + Unpin + Send + Sync + 'static,
    {
        let parts = head.into_parts();
        let url = self.resolve_url(&parts.uri, &parts.headers, &connection)?;
        trace!(method = %parts.method, %url, "mapped request");

        let body = if body.payload_size().is_empty() { Body::empty() } else { Body::stream(body) };

        Ok(Request::builder(parts.method, url)
            .version(parts.version)
            .headers(parts.headers)
            .body(body)
            .connection(connection)
            .build())
    }

    fn resolve_url(&self, target: &http::Uri, headers: &HeaderMap, connection: &ConnectionInfo) -> Result<Url, MalformedRequest> {
        let forwarded = |name: &str| {
            self.trust_forwarded_headers
                .then(|| first_token(headers, name))
                .flatten()
        };

        let scheme = forwarded(X_FORWARDED_PROTO)
            .map(|proto| proto.to_ascii_lowercase())
            .unwrap_or_else(|| if connection.encrypted { "https" } else { "http" }.to_owned());
        let host = forwarded(X_FORWARDED_HOST)
            .or_else(|| headers.get(HOST).and_then(|host| host.to_str().ok()).filter(|host| !host.is_empty()))
            .unwrap_or(FALLBACK_HOST);

        let origin = format!("{scheme}://{host}");
        let target = target.to_string();
        Url::parse(&origin)
            .and_then(|origin| origin.join(&target))
            .map_err(|source| MalformedRequest::Url { url: format!("{origin}{target}"), source })
    }
}

/// The first comma separated value of a header, as proxies append theirs.
fn first_token<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let value = headers.get(name)?.to_str().ok()?;
    let token = value.split(',').next()?.trim();
    (!token.is_empty()).then_some(token)
}
