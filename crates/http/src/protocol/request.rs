//! The head of an inbound HTTP request.
//!
//! Wraps `http::Request<()>` so the codec can hand out method, target, version and header
//! lines as soon as they are parsed, before any payload has been read.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// Method, request target, version and header lines of a request, as read off the wire.
#[derive(Debug)]
pub struct RequestHead {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHead {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHead {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHead {
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    pub fn into_parts(self) -> Parts {
        self.inner.into_parts().0
    }

    /// Attaches a body to this head, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// The raw request target, usually origin-form (`/path?query`).
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the framing headers of this request should be consulted for a payload.
    ///
    /// GET and HEAD requests never carry one.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD)
    }

    /// Whether the client asked for an interim `100 Continue` before sending its payload.
    pub fn expects_continue(&self) -> bool {
        self.headers()
            .get(http::header::EXPECT)
            .is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
    }
}

impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHead {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
