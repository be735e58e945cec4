use std::collections::HashMap;

use http::{HeaderMap, HeaderName, HeaderValue, Method, Version};
use strand_http::connection::ConnectionInfo;
use url::Url;

use crate::body::Body;
use crate::cookie::parse_cookie_header;

/// A normalized inbound request.
///
/// Everything but the body is fixed at creation. The body is a lazy stream that a handler
/// may take at most once; GET and HEAD requests never carry one.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    version: Version,
    headers: HeaderMap,
    cookies: HashMap<String, String>,
    body: Option<Body>,
    connection: ConnectionInfo,
}

impl Request {
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder {
            method,
            url,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: None,
            connection: ConnectionInfo::default(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute request URL, including scheme, host, path and query.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The first value of `name`, if it is valid visible ASCII.
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// Whether the request still has an unconsumed body.
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Takes the body stream. Later calls return `None`.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    pub fn into_body(self) -> Option<Body> {
        self.body
    }
}

#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    version: Version,
    headers: HeaderMap,
    body: Option<Body>,
    connection: ConnectionInfo,
}

impl RequestBuilder {
    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header value, keeping earlier values of the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Attaches a body. Ignored for GET and HEAD.
    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn connection(mut self, connection: ConnectionInfo) -> Self {
        self.connection = connection;
        self
    }

    pub fn build(self) -> Request {
        let cookies = parse_cookie_header(&self.headers);
        let body = match self.method {
            Method::GET | Method::HEAD => None,
            _ => self.body,
        };
        Request {
            method: self.method,
            url: self.url,
            version: self.version,
            headers: self.headers,
            cookies,
            body,
            connection: self.connection,
        }
    }
}
