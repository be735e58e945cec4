//! Decoder for `Transfer-Encoding: chunked` payloads.
//!
//! Each chunk is a hex size line (extensions after `;` are ignored), the chunk data and a
//! CRLF. A zero sized chunk ends the payload; trailer lines after it are skipped.

use std::cmp;

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};

/// Longest size or trailer line accepted
const MAX_LINE_BYTES: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Reading a chunk size line
    Size,
    /// Reading chunk data, with this many bytes left
    Data(u64),
    /// Reading the CRLF that closes chunk data
    DataEnd,
    /// Skipping trailer lines until the empty line
    Trailer,
    /// The last chunk and its trailer were read
    Done,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                State::Size => {
                    let Some(line_end) = find_crlf(src) else {
                        ensure!(src.len() <= MAX_LINE_BYTES, ParseError::invalid_body("chunk size line too long"));
                        return Ok(None);
                    };
                    let size = parse_chunk_size(&src[..line_end])?;
                    src.advance(line_end + 2);
                    trace!(chunk_size = size, "read chunk size");
                    self.state = if size == 0 { State::Trailer } else { State::Data(size) };
                }
                State::Data(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = cmp::min(remaining, src.len() as u64);
                    #[allow(clippy::cast_possible_truncation, reason = "len is bounded by src.len()")]
                    let bytes = src.split_to(len as usize).freeze();
                    let remaining = remaining - len;
                    self.state = if remaining == 0 { State::DataEnd } else { State::Data(remaining) };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }
                State::DataEnd => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    ensure!(&src[..2] == b"\r\n", ParseError::invalid_body("missing CRLF after chunk data"));
                    src.advance(2);
                    self.state = State::Size;
                }
                State::Trailer => {
                    let Some(line_end) = find_crlf(src) else {
                        ensure!(src.len() <= MAX_LINE_BYTES, ParseError::invalid_body("trailer line too long"));
                        return Ok(None);
                    };
                    src.advance(line_end + 2);
                    if line_end == 0 {
                        self.state = State::Done;
                    }
                }
                State::Done => return Ok(Some(PayloadItem::Eof)),
            }
        }
    }
}

fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(2).position(|window| window == b"\r\n")
}

fn parse_chunk_size(line: &[u8]) -> Result<u64, ParseError> {
    let size = line.split(|b| *b == b';').next().unwrap_or_default().trim_ascii();
    ensure!(!size.is_empty(), ParseError::invalid_body("empty chunk size"));

    let mut value: u64 = 0;
    for b in size {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            b'A'..=b'F' => b - b'A' + 10,
            _ => return Err(ParseError::invalid_body("invalid chunk size")),
        };
        value = value
            .checked_mul(16)
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or_else(|| ParseError::invalid_body("chunk size overflow"))?;
    }
    Ok(value)
}
