//! Streaming access to the payload of the request being served.
//!
//! Each connection serves exactly one request, so [`ReqBody`] takes ownership of the
//! connection's read half once the head has been parsed and decodes the payload lazily,
//! one frame per poll. Dropping it abandons whatever payload is left unread.

mod req_body;

pub use req_body::ReqBody;
