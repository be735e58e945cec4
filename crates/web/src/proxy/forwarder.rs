use std::sync::Arc;

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::proxy::client::{ClientError, ClientRequest, ClientResponse, HttpClient};
use crate::proxy::descriptor::{Forward, ProxyDescriptor};
use crate::request::Request;
use crate::response::Response;

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream answered with a status the descriptor doesn't pass through.
    #[error("upstream rejected with status {}", .response.status)]
    Rejected { response: Box<ClientResponse> },

    #[error("upstream request failed: {source}")]
    Upstream {
        #[from]
        source: ClientError,
    },
}

impl ProxyError {
    /// The upstream response behind a rejection.
    pub fn upstream_response(&self) -> Option<&ClientResponse> {
        match self {
            Self::Rejected { response } => Some(response),
            Self::Upstream { .. } => None,
        }
    }
}

/// Forwards requests through an [`HttpClient`].
#[derive(Clone)]
pub struct ProxyForwarder {
    client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ProxyForwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyForwarder").finish_non_exhaustive()
    }
}

impl ProxyForwarder {
    pub fn new<C: HttpClient + 'static>(client: C) -> Self {
        Self { client: Arc::new(client) }
    }

    pub fn from_arc(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// Sends the descriptor's request upstream and builds the response to hand back.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Rejected`] when status is not forwarded and the upstream answered with
    /// something other than a success (or a redirect that is forwarded);
    /// [`ProxyError::Upstream`] when the call itself failed.
    pub async fn forward(&self, descriptor: ProxyDescriptor) -> Result<Response, ProxyError> {
        let ProxyDescriptor {
            target_url,
            mut request,
            forward_method,
            forward_query_params,
            forward_headers,
            forward_body,
            forward_redirect,
            forward_status,
            forward_response_headers,
            forward_response_body,
            forwarded_headers,
            server_certificate,
        } = descriptor;

        let inbound_method = request.method().clone();
        let mut upstream = ClientRequest::new(upstream_url(target_url, request.url(), &forward_query_params));
        upstream.method = forward_method.allows_ignore_case(inbound_method.as_str()).then(|| inbound_method.clone());
        upstream.headers = upstream_headers(&request, &forward_headers, forwarded_headers);
        if forward_body && inbound_method != Method::GET && inbound_method != Method::HEAD {
            upstream.body = request.take_body();
        }
        upstream.follow_redirects = !forward_redirect;
        upstream.assert_status_ok = !forward_status;
        upstream.server_certificate = server_certificate;

        debug!(method = %upstream.effective_method(), url = %upstream.url, "forward request");
        let upstream_response = match self.client.request(upstream).await {
            Ok(response) => response,
            Err(ClientError::UpstreamStatus(response)) => {
                warn!(status = response.status.as_u16(), "upstream rejected");
                return Err(ProxyError::Rejected { response });
            }
            Err(e) => {
                warn!(cause = %e, "upstream request failed");
                return Err(e.into());
            }
        };

        let status = upstream_response.status;
        let acceptable = status.is_success() || (forward_redirect && status.is_redirection());
        if !forward_status && !acceptable {
            warn!(status = status.as_u16(), "upstream rejected");
            return Err(ProxyError::Rejected { response: Box::new(upstream_response) });
        }

        let ClientResponse { status, status_message, headers, body } = upstream_response;
        let mut builder = Response::builder();
        if forward_status {
            builder = builder.status(status);
            if let Some(status_message) = status_message {
                builder = builder.status_message(status_message);
            }
        } else {
            builder = builder.status(StatusCode::OK);
        }
        for (name, value) in &headers {
            if forward_response_headers.allows_ignore_case(name.as_str()) {
                builder = builder.header(name.clone(), value.clone());
            }
        }
        if forward_response_body
            && inbound_method != Method::HEAD
            && let Some(body) = body
        {
            builder = builder.body(body);
        }

        Ok(builder.build())
    }
}

fn upstream_url(mut target: Url, inbound: &Url, forward: &Forward) -> Url {
    let pairs: Vec<(String, String)> = inbound
        .query_pairs()
        .filter(|(name, _)| forward.allows(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if !pairs.is_empty() {
        target.query_pairs_mut().extend_pairs(pairs);
    }
    target
}

fn upstream_headers(request: &Request, forward: &Forward, forwarded_headers: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in request.headers() {
        if forward.allows_ignore_case(name.as_str()) {
            headers.append(name.clone(), value.clone());
        }
    }

    if forwarded_headers {
        let url = request.url();
        if let Some(host) = url.host_str() {
            let host = match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_owned(),
            };
            if let Ok(host) = HeaderValue::from_str(&host) {
                headers.insert(X_FORWARDED_HOST, host);
            }
        }
        if let Ok(proto) = HeaderValue::from_str(url.scheme()) {
            headers.insert(X_FORWARDED_PROTO, proto);
        }
    }
    headers
}
