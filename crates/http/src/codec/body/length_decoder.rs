use std::cmp;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

/// Reads exactly the number of bytes announced by Content-Length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        #[allow(clippy::cast_possible_truncation, reason = "bounded by src.len()")]
        let len = cmp::min(self.remaining, src.len() as u64) as usize;
        let bytes = src.split_to(len).freeze();
        self.remaining -= len as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}
