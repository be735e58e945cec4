//! Serializes a [`ResponseHead`] into a status line and header lines.
//!
//! The framing headers are rewritten to agree with the [`PayloadSize`] the body will be
//! written with, so a handler-provided Content-Length never contradicts chunked encoding.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use http::{HeaderValue, header};
use tokio_util::codec::Encoder;

use crate::protocol::{PayloadSize, ResponseHead, SendError};

/// Initial buffer size reserved for a response head
const INIT_HEADER_SIZE: usize = 4 * 1024;

const CHUNKED: HeaderValue = HeaderValue::from_static("chunked");
const ZERO: HeaderValue = HeaderValue::from_static("0");

#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, PayloadSize)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", head.status().as_str(), head.reason())?;

        let headers = head.headers_mut();
        match payload_size {
            PayloadSize::Length(n) => {
                headers.remove(header::TRANSFER_ENCODING);
                headers.insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Chunked => {
                headers.remove(header::CONTENT_LENGTH);
                headers.insert(header::TRANSFER_ENCODING, CHUNKED);
            }
            // a declared length without a body is kept as is, which is what HEAD responses need
            PayloadSize::Empty => {
                headers.remove(header::TRANSFER_ENCODING);
                if !headers.contains_key(header::CONTENT_LENGTH) {
                    headers.insert(header::CONTENT_LENGTH, ZERO);
                }
            }
        }

        for (name, value) in headers.iter() {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut` that has already been reserved.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn encode(head: ResponseHead, payload_size: PayloadSize) -> String {
        let mut dst = BytesMut::new();
        HeaderEncoder.encode((head, payload_size), &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn writes_custom_reason_phrase() {
        let mut head = ResponseHead::new(StatusCode::IM_A_TEAPOT);
        head.set_reason(Some("Short And Stout"));

        let raw = encode(head, PayloadSize::Empty);
        assert!(raw.starts_with("HTTP/1.1 418 Short And Stout\r\n"));
        assert!(raw.contains("content-length: 0\r\n"));
        assert!(raw.ends_with("\r\n\r\n"));
    }

    #[test]
    fn chunked_replaces_content_length() {
        let mut head = ResponseHead::new(StatusCode::OK);
        head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from_static("10"));

        let raw = encode(head, PayloadSize::Chunked);
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("transfer-encoding: chunked\r\n"));
        assert!(!raw.contains("content-length"));
    }

    #[test]
    fn empty_payload_keeps_declared_length() {
        let mut head = ResponseHead::new(StatusCode::OK);
        head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from_static("1024"));

        let raw = encode(head, PayloadSize::Empty);
        assert!(raw.contains("content-length: 1024\r\n"));
    }

    #[test]
    fn repeated_headers_become_separate_lines() {
        let mut head = ResponseHead::new(StatusCode::OK);
        head.headers_mut().append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        head.headers_mut().append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let raw = encode(head, PayloadSize::Length(5));
        assert!(raw.contains("set-cookie: a=1\r\nset-cookie: b=2\r\n"));
        assert!(raw.contains("content-length: 5\r\n"));
    }
}
