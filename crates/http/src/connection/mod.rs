//! One accepted connection, serving exactly one request.
//!
//! [`RawConnection`] reads the request head, then splits into the lazily read
//! [`ReqBody`](crate::protocol::ReqBody) and a [`ResponseWriter`] that owns the write half.
//! Every response is written with `Connection: close` and the connection is shut down once
//! the writer is closed.

mod connection_info;
mod raw_connection;
mod response_writer;

pub use connection_info::ConnectionInfo;
pub use raw_connection::RawConnection;
pub use response_writer::ResponseWriter;
