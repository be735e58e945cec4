use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHead};

/// Decodes a request head followed by its payload.
///
/// While `payload_decoder` is `None` the decoder is reading a head; once a head is decoded
/// it switches to the payload framing that head announced until the payload's EOF.
#[derive(Debug, Default)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder = None;
                    Some(Message::Payload(item))
                }
                None => None,
            };
            return Ok(message);
        }

        let message = self.header_decoder.decode(src)?.map(|(head, payload_size)| {
            self.payload_decoder = Some(payload_size.into());
            Message::Header((head, payload_size))
        });
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn head_then_payload() {
        let mut buffer = BytesMut::from("PUT /file HTTP/1.1\r\nContent-Length: 4\r\n\r\ndata");
        let mut decoder = RequestDecoder::new();

        let Some(Message::Header((head, payload_size))) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expected a head");
        };
        assert_eq!(head.uri().path(), "/file");
        assert_eq!(payload_size, PayloadSize::Length(4));

        let Some(Message::Payload(item)) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"data")));

        let Some(Message::Payload(item)) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expected payload eof");
        };
        assert!(item.is_eof());
    }
}
