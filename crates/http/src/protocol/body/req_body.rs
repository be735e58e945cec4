use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use futures::StreamExt;
use http_body::{Body, Frame, SizeHint};
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::trace;

use crate::codec::RequestDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize};

/// The payload of a request, decoded on demand from the connection's read half.
///
/// Implements `http_body::Body`; nothing is read from the socket until the body is polled.
#[derive(Debug)]
pub struct ReqBody<R> {
    framed_read: FramedRead<R, RequestDecoder>,
    payload_size: PayloadSize,
    eof: bool,
}

impl<R> ReqBody<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(framed_read: FramedRead<R, RequestDecoder>, payload_size: PayloadSize) -> Self {
        Self { framed_read, payload_size, eof: payload_size.is_empty() }
    }

    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }
}

impl<R> Body for ReqBody<R>
where
    R: AsyncRead + Unpin,
{
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.eof {
            return Poll::Ready(None);
        }

        let item = match ready!(this.framed_read.poll_next_unpin(cx)) {
            Some(Ok(Message::Payload(item))) => item,
            Some(Ok(Message::Header(_))) => {
                this.eof = true;
                return Poll::Ready(Some(Err(ParseError::invalid_body("received a request head while reading the body"))));
            }
            Some(Err(e)) => {
                this.eof = true;
                return Poll::Ready(Some(Err(e)));
            }
            None => {
                this.eof = true;
                return Poll::Ready(Some(Err(ParseError::invalid_body("connection closed before the body was complete"))));
            }
        };

        match item {
            PayloadItem::Chunk(bytes) => {
                trace!(size = bytes.len(), "read request body chunk");
                Poll::Ready(Some(Ok(Frame::data(bytes))))
            }
            PayloadItem::Eof => {
                this.eof = true;
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.eof
    }

    fn size_hint(&self) -> SizeHint {
        match self.payload_size {
            PayloadSize::Length(length) => SizeHint::with_exact(length),
            PayloadSize::Chunked => SizeHint::default(),
            PayloadSize::Empty => SizeHint::with_exact(0),
        }
    }
}
