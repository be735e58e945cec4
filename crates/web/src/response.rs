use std::borrow::Cow;
use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use crate::body::Body;
use crate::cookie::CookieDirective;

/// A normalized outbound response, built in one step and consumed once when written.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    status_message: Option<Cow<'static, str>>,
    headers: HeaderMap,
    cookies: BTreeMap<String, CookieDirective>,
    body: Option<Body>,
}

/// The pieces of a [`Response`], for code that writes or rewraps it.
#[derive(Debug)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub status_message: Option<Cow<'static, str>>,
    pub headers: HeaderMap,
    pub cookies: BTreeMap<String, CookieDirective>,
    pub body: Option<Body>,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// A response with the given status and body and nothing else.
    pub fn new(status: StatusCode, body: Option<Body>) -> Self {
        Self { status, status_message: None, headers: HeaderMap::new(), cookies: BTreeMap::new(), body }
    }

    /// A bodiless response.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, None)
    }

    /// A `text/plain` response.
    pub fn text<T: Into<String>>(body: T, status: StatusCode) -> Self {
        Self::builder()
            .status(status)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .body(Body::once(Bytes::from(body.into())))
            .build()
    }

    /// A redirect to `location`, which is expected to be an absolute URL.
    ///
    /// A `location` that is not a valid header value yields a bodiless 500 instead.
    pub fn redirect(location: &str, status: StatusCode) -> Self {
        match HeaderValue::from_str(location) {
            Ok(location) => Self::builder().status(status).header(LOCATION, location).build(),
            Err(_) => Self::empty(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase, defaulting to the canonical one for the status.
    pub fn status_message(&self) -> &str {
        match &self.status_message {
            Some(message) => message,
            None => self.status.canonical_reason().unwrap_or(""),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn cookies(&self) -> &BTreeMap<String, CookieDirective> {
        &self.cookies
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<Body> {
        self.body
    }

    pub fn into_parts(self) -> ResponseParts {
        ResponseParts {
            status: self.status,
            status_message: self.status_message,
            headers: self.headers,
            cookies: self.cookies,
            body: self.body,
        }
    }

    pub fn from_parts(parts: ResponseParts) -> Self {
        Self {
            status: parts.status,
            status_message: parts.status_message,
            headers: parts.headers,
            cookies: parts.cookies,
            body: parts.body,
        }
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    fn new() -> Self {
        Self { inner: Response::empty(StatusCode::OK) }
    }

    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.inner.status = status;
        self
    }

    #[must_use]
    pub fn status_message<M: Into<Cow<'static, str>>>(mut self, message: M) -> Self {
        self.inner.status_message = Some(message.into());
        self
    }

    /// Appends a header value, keeping earlier values of the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.inner.headers.append(name, value);
        self
    }

    /// Replaces any earlier values of the header.
    #[must_use]
    pub fn insert_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.inner.headers.insert(name, value);
        self
    }

    /// Merges `headers` in, replacing earlier values of every name it contains.
    #[must_use]
    pub fn merge_headers(mut self, headers: HeaderMap) -> Self {
        let mut last_name = None;
        for (name, value) in headers {
            match name {
                Some(name) => {
                    self.inner.headers.insert(name.clone(), value);
                    last_name = Some(name);
                }
                None => {
                    if let Some(name) = &last_name {
                        self.inner.headers.append(name.clone(), value);
                    }
                }
            }
        }
        self
    }

    #[must_use]
    pub fn cookie<N: Into<String>>(mut self, name: N, directive: CookieDirective) -> Self {
        self.inner.cookies.insert(name.into(), directive);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.inner.body = Some(body);
        self
    }

    pub fn build(self) -> Response {
        self.inner
    }
}
