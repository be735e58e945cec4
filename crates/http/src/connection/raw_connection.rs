use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedRead;
use tracing::{debug, info};

use crate::codec::RequestDecoder;
use crate::connection::{ConnectionInfo, ResponseWriter};
use crate::protocol::{Message, ParseError, PayloadSize, ReqBody, RequestHead};

/// A freshly accepted connection, before its request head has been read.
///
/// # Type Parameters
///
/// * `R`: the readable half of the transport
/// * `W`: the writable half of the transport
#[derive(Debug)]
pub struct RawConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: ResponseWriter<W>,
    info: ConnectionInfo,
    payload_size: PayloadSize,
}

impl<R, W> RawConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, info: ConnectionInfo) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            writer: ResponseWriter::new(writer),
            info,
            payload_size: PayloadSize::Empty,
        }
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// The response side, available before the head is read so defaults can be staged.
    pub fn writer_mut(&mut self) -> &mut ResponseWriter<W> {
        &mut self.writer
    }

    /// Reads the request head.
    ///
    /// Answers `Expect: 100-continue` with an interim response before returning, so the
    /// client starts sending the payload the handler is about to read.
    ///
    /// # Errors
    ///
    /// [`ParseError::ConnectionClosed`] if the peer closed the connection before a complete
    /// head arrived, any other [`ParseError`] if the head is malformed.
    pub async fn read_head(&mut self) -> Result<RequestHead, ParseError> {
        let (head, payload_size) = match self.framed_read.next().await {
            Some(Ok(Message::Header(header))) => header,
            Some(Ok(Message::Payload(_))) => return Err(ParseError::invalid_body("payload received before a request head")),
            Some(Err(e)) => return Err(e),
            None => {
                debug!("connection closed before a request head");
                return Err(ParseError::ConnectionClosed);
            }
        };

        if head.expects_continue() && !payload_size.is_empty() {
            self.writer.send_continue().await.map_err(ParseError::Continue)?;
            info!("receive expect request header, sent continue response");
        }

        self.payload_size = payload_size;
        Ok(head)
    }

    /// Splits the connection into the request payload and the response side.
    pub fn into_parts(self) -> (ReqBody<R>, ResponseWriter<W>, ConnectionInfo) {
        (ReqBody::new(self.framed_read, self.payload_size), self.writer, self.info)
    }
}
