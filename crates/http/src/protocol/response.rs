//! The head of an outbound HTTP response.

use std::borrow::Cow;

use http::{HeaderMap, StatusCode, Version};

/// Status line and header lines of a response.
///
/// Unlike `http::response::Parts`, the head carries an optional custom reason phrase which
/// replaces the canonical one on the status line.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    status: StatusCode,
    reason: Option<Cow<'static, str>>,
    version: Version,
    headers: HeaderMap,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self { status, reason: None, version: Version::HTTP_11, headers: HeaderMap::new() }
    }

    pub fn with_headers(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, reason: None, version: Version::HTTP_11, headers }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Replaces the reason phrase written on the status line. `None` restores the canonical one.
    pub fn set_reason<R: Into<Cow<'static, str>>>(&mut self, reason: Option<R>) {
        self.reason = reason.map(Into::into);
    }

    /// The reason phrase that will be written on the status line.
    ///
    /// Falls back to the canonical phrase of the status, or an empty string for unknown codes.
    pub fn reason(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => self.status.canonical_reason().unwrap_or(""),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}
