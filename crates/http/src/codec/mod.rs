//! `tokio_util` codecs for HTTP/1.x.
//!
//! [`RequestDecoder`] turns bytes into a request head followed by payload items, and
//! [`ResponseEncoder`] does the reverse for a response. Both pick the payload framing
//! (Content-Length, chunked, or none) from the head.

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use header::{MAX_HEADER_BYTES, MAX_HEADER_NUM};
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
