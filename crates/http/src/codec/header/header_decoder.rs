//! Parses the head of an HTTP/1.x request with `httparse`.
//!
//! Header names and values are recorded as byte ranges into the read buffer and then
//! sliced out of one frozen `Bytes`, so header values share the buffer instead of being
//! copied one by one.
//!
//! Limits: at most [`MAX_HEADER_NUM`] header lines and [`MAX_HEADER_BYTES`] bytes of head.

use std::mem::MaybeUninit;

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Request};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, RequestHead};

/// Maximum number of header lines allowed in a request
pub const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes of the request line plus all header lines
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes a [`RequestHead`] and the [`PayloadSize`] its framing headers announce.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut req = httparse::Request::new(&mut []);
        // SAFETY: an array of `MaybeUninit` needs no initialization
        let mut headers: [MaybeUninit<httparse::Header<'_>>; MAX_HEADER_NUM] = unsafe { MaybeUninit::uninit().assume_init() };

        let parsed_result = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed request head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let header_count = req.headers.len();
                let mut header_index = [HeaderIndex::EMPTY; MAX_HEADER_NUM];
                HeaderIndex::record(src, req.headers, &mut header_index);

                let version = match req.version {
                    Some(0) => http::Version::HTTP_10,
                    Some(1) => http::Version::HTTP_11,
                    v => return Err(ParseError::UnsupportedVersion(v)),
                };

                let method = req.method.ok_or(ParseError::InvalidRequestLine("method"))?;
                let method = http::Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidRequestLine("method"))?;
                let uri = req.path.ok_or(ParseError::InvalidRequestLine("target"))?;
                let uri = uri.parse::<http::Uri>().map_err(|_| ParseError::InvalidRequestLine("target"))?;

                let mut request = Request::new(());
                *request.method_mut() = method;
                *request.uri_mut() = uri;
                *request.version_mut() = version;

                let header_bytes = src.split_to(body_offset).freeze();
                let headers = request.headers_mut();
                headers.reserve(header_count);
                for index in &header_index[..header_count] {
                    let name = HeaderName::from_bytes(&header_bytes[index.name.0..index.name.1])
                        .map_err(|_| ParseError::invalid_header("invalid header name"))?;
                    let value = HeaderValue::from_maybe_shared(header_bytes.slice(index.value.0..index.value.1))
                        .map_err(|_| ParseError::invalid_header(format!("invalid value for header {name}")))?;
                    headers.append(name, value);
                }

                let head = RequestHead::from(request);
                let payload_size = parse_payload(&head)?;
                Ok(Some((head, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Byte ranges of one header line's name and value within the read buffer.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

impl HeaderIndex {
    const EMPTY: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            index.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            index.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Picks the payload framing from Transfer-Encoding and Content-Length.
///
/// A request carrying both is rejected. A Transfer-Encoding whose last coding is not
/// `chunked` cannot be framed and is treated as having no payload.
fn parse_payload(head: &RequestHead) -> Result<PayloadSize, ParseError> {
    if !head.need_body() {
        return Ok(PayloadSize::new_empty());
    }

    let te_header = head.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (Some(te_value), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else {
                Ok(PayloadSize::new_empty())
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value is not visible ascii"))?;
            let length = cl_str
                .trim()
                .parse::<u64>()
                .map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer-encoding and content-length both present")),
    }
}

/// Whether `chunked` is the final coding of a Transfer-Encoding value.
fn is_chunked(value: &HeaderValue) -> bool {
    value
        .as_bytes()
        .rsplit(|b| *b == b',')
        .next()
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}
