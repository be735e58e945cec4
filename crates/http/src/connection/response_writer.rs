use bytes::Bytes;
use futures::SinkExt;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;
use tracing::trace;

use crate::codec::ResponseEncoder;
use crate::protocol::{Message, PayloadItem, PayloadSize, ResponseHead, SendError};

const CLOSE: HeaderValue = HeaderValue::from_static("close");

/// The response side of a connection.
///
/// Headers are staged in [`headers_mut`](Self::headers_mut) until [`send_head`](Self::send_head)
/// writes the status line; after that only payload can follow. Payload writes are flushed
/// one by one, so a slow peer slows down whoever produces the payload.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    framed_write: FramedWrite<W, ResponseEncoder>,
    headers: HeaderMap,
    head_sent: bool,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { framed_write: FramedWrite::new(writer, ResponseEncoder::new()), headers: HeaderMap::new(), head_sent: false }
    }

    /// Headers staged for the response head. Changes after the head was sent have no effect.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_head_sent(&self) -> bool {
        self.head_sent
    }

    pub(crate) async fn send_continue(&mut self) -> Result<(), SendError> {
        let writer = self.framed_write.get_mut();
        writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Writes the status line and the staged headers.
    ///
    /// `reason` replaces the canonical reason phrase. The framing headers are set from
    /// `payload_size`, and `Connection: close` is added since no second request is read.
    /// A head without payload is flushed right away; otherwise it goes out with the first chunk.
    pub async fn send_head(&mut self, status: StatusCode, reason: Option<&str>, payload_size: PayloadSize) -> Result<(), SendError> {
        if self.head_sent {
            return Err(SendError::HeadAlreadySent);
        }

        let mut headers = std::mem::take(&mut self.headers);
        headers.insert(header::CONNECTION, CLOSE);
        let mut head = ResponseHead::with_headers(status, headers);
        head.set_reason(reason.map(ToOwned::to_owned));

        trace!(status = status.as_u16(), ?payload_size, "send response head");
        self.head_sent = true;
        let message = Message::Header((head, payload_size));
        if payload_size.is_empty() {
            self.framed_write.send(message).await
        } else {
            self.framed_write.feed(message).await
        }
    }

    /// Writes one piece of payload and waits until it is flushed to the peer.
    pub async fn send_data(&mut self, data: Bytes) -> Result<(), SendError> {
        if !self.head_sent {
            return Err(SendError::HeadNotSent);
        }
        self.framed_write.send(Message::Payload(PayloadItem::Chunk(data))).await
    }

    /// Marks the end of the payload.
    pub async fn send_eof(&mut self) -> Result<(), SendError> {
        if !self.head_sent {
            return Err(SendError::HeadNotSent);
        }
        self.framed_write.send(Message::Payload(PayloadItem::Eof)).await
    }

    /// Flushes whatever is buffered and shuts the write half down.
    pub async fn close(&mut self) -> Result<(), SendError> {
        SinkExt::<Message<(ResponseHead, PayloadSize)>>::flush(&mut self.framed_write).await?;
        self.framed_write.get_mut().shutdown().await?;
        Ok(())
    }
}
