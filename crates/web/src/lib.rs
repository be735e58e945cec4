//! An HTTP runtime on top of `strand-http`.
//!
//! Inbound requests are normalized into a [`Request`], handled by a [`RequestHandler`], and the
//! [`Response`] it returns is streamed back. On top of that the crate provides the pieces most
//! handlers need:
//!
//! - [`static_file::StaticFileResponder`] serves files with single byte range support
//! - [`proxy::ProxyForwarder`] forwards requests selectively through an [`proxy::HttpClient`]
//! - [`cookie`] reads `Cookie` headers and writes `Set-Cookie` directives
//! - [`validate_methods`] and [`authorization_parameters`] for method and credential checks
//!
//! [`server::Server`] binds the HTTP and HTTPS listeners and shuts them down gracefully.
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use strand_web::server::{Server, ServerConfig};
//! use strand_web::{BoxError, Request, Response, handler_fn};
//!
//! async fn hello(request: Request) -> Result<Option<Response>, BoxError> {
//!     Ok((request.url().path() == "/").then(|| Response::text("hello", StatusCode::OK)))
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig { listen_http_port: 8080, listen_https_port: 0, ..ServerConfig::default() };
//! Server::builder().config(config).build().run(handler_fn(hello)).await?;
//! # Ok(())
//! # }
//! ```

mod authorization;
mod body;
mod handler;
mod methods;
mod request;
mod response;

pub mod cookie;
pub mod mapper;
pub mod mime_lookup;
pub mod proxy;
pub mod range;
pub mod server;
pub mod static_file;

pub use authorization::Authorization;
pub use authorization::authorization_parameters;
pub use body::Body;
pub use body::BoxError;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use methods::validate_methods;
pub use request::Request;
pub use request::RequestBuilder;
pub use response::Response;
pub use response::ResponseBuilder;
pub use response::ResponseParts;

pub use strand_http::connection::ConnectionInfo;
