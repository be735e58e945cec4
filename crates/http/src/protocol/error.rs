use std::io;
use thiserror::Error;

/// Failure while reading a request head or its payload.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request head is {size} bytes, limit is {limit}")]
    HeadTooLarge { size: usize, limit: usize },

    #[error("request carries more than {limit} headers")]
    TooManyHeaders { limit: usize },

    #[error("malformed header: {0}")]
    InvalidHeader(String),

    #[error("unsupported http version: {0:?}")]
    UnsupportedVersion(Option<u8>),

    #[error("malformed request line: bad {0}")]
    InvalidRequestLine(&'static str),

    #[error("bad content-length: {0}")]
    InvalidContentLength(String),

    #[error("malformed payload: {0}")]
    InvalidBody(String),

    #[error("connection closed before a request head was received")]
    ConnectionClosed,

    #[error("failed to send 100 continue: {0}")]
    Continue(#[source] SendError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ParseError {
    pub fn too_large_header(size: usize, limit: usize) -> Self {
        Self::HeadTooLarge { size, limit }
    }

    pub fn too_many_headers(limit: usize) -> Self {
        Self::TooManyHeaders { limit }
    }

    pub fn invalid_header(reason: impl Into<String>) -> Self {
        Self::InvalidHeader(reason.into())
    }

    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::InvalidBody(reason.into())
    }

    pub fn invalid_content_length(reason: impl Into<String>) -> Self {
        Self::InvalidContentLength(reason.into())
    }
}

/// Failure while writing a response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("malformed payload: {0}")]
    InvalidBody(String),

    #[error("response head already sent")]
    HeadAlreadySent,

    #[error("response head not sent yet")]
    HeadNotSent,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SendError {
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::InvalidBody(reason.into())
    }
}
