use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use thiserror::Error;
use url::Url;

use crate::body::{Body, BoxError};

/// An outbound request.
#[derive(Debug)]
pub struct ClientRequest {
    pub url: Url,
    /// `None` lets the client use its default, `GET`.
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub follow_redirects: bool,
    /// Reject a non-success final status with [`ClientError::UpstreamStatus`].
    pub assert_status_ok: bool,
    /// PEM certificate the upstream server is expected to present.
    pub server_certificate: Option<String>,
}

impl ClientRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            method: None,
            headers: HeaderMap::new(),
            body: None,
            follow_redirects: true,
            assert_status_ok: false,
            server_certificate: None,
        }
    }

    /// The method the request goes out with.
    pub fn effective_method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

/// An upstream response, its body not read yet.
#[derive(Debug)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub status_message: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

impl ClientResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, status_message: None, headers: HeaderMap::new(), body: None }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {source}")]
    Transport { source: BoxError },

    #[error("upstream responded with status {}", .0.status)]
    UpstreamStatus(Box<ClientResponse>),

    #[error("too many redirects, the limit is {max}")]
    TooManyRedirects { max: usize },

    #[error("invalid redirect location: {location}")]
    InvalidRedirect { location: String },
}

impl ClientError {
    pub fn transport<E: Into<BoxError>>(e: E) -> Self {
        Self::Transport { source: e.into() }
    }
}

/// The capability of making one HTTP request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: ClientRequest) -> Result<ClientResponse, ClientError>;
}
