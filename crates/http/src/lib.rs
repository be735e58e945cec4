//! HTTP/1.x transport for the strand runtime.
//!
//! This crate owns the bytes on the wire: it parses a request head, streams the request
//! payload on demand, and writes a response head and payload back. It knows nothing about
//! cookies, ranges, routing or TLS; those live in `strand-web`, which drives one
//! [`connection::RawConnection`] per accepted socket.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::StatusCode;
//! use strand_http::connection::{ConnectionInfo, RawConnection};
//! use strand_http::protocol::PayloadSize;
//! use tokio::net::TcpListener;
//!
//! # async fn serve() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = TcpListener::bind("127.0.0.1:8080").await?;
//! let (stream, remote_addr) = listener.accept().await?;
//! let (reader, writer) = stream.into_split();
//!
//! let mut connection = RawConnection::new(reader, writer, ConnectionInfo::plain().with_remote_addr(remote_addr));
//! let head = connection.read_head().await?;
//! let (_body, mut writer, _info) = connection.into_parts();
//!
//! let greeting = Bytes::from(format!("hello {}", head.uri().path()));
//! writer.send_head(StatusCode::OK, None, PayloadSize::Length(greeting.len() as u64)).await?;
//! writer.send_data(greeting).await?;
//! writer.send_eof().await?;
//! writer.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`connection`]: one accepted connection, its request payload and its response writer
//! - [`protocol`]: message heads, payload framing and error types
//! - [`codec`]: the `tokio_util` decoder and encoder behind the connection
//!
//! # Limits
//!
//! - HTTP/1.0 and HTTP/1.1 only, one request per connection
//! - request head at most 8 KiB with at most 64 header lines

pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
