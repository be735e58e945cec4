use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::warn;

use crate::protocol::{PayloadItem, SendError};

/// Writes a payload of a declared length, dropping anything past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    eof: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, eof: false }
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl Encoder<PayloadItem> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if bytes.is_empty() {
                    return Ok(());
                }
                if self.remaining == 0 {
                    warn!(size = bytes.len(), "payload exceeds the declared length, dropping chunk");
                    return Ok(());
                }
                #[allow(clippy::cast_possible_truncation, reason = "bounded by bytes.len()")]
                let len = self.remaining.min(bytes.len() as u64) as usize;
                if len < bytes.len() {
                    warn!(dropped = bytes.len() - len, "payload exceeds the declared length, truncating chunk");
                }
                dst.extend_from_slice(&bytes[..len]);
                self.remaining -= len as u64;
                Ok(())
            }
            PayloadItem::Eof => {
                if self.remaining > 0 {
                    return Err(SendError::invalid_body(format!("payload ended {} bytes short of the declared length", self.remaining)));
                }
                self.eof = true;
                Ok(())
            }
        }
    }
}
