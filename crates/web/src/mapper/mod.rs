//! The boundary between a raw connection and the normalized model.
//!
//! [`RequestMapper`] turns a decoded request head and its lazy payload into a [`Request`](crate::Request);
//! [`ResponseMapper`] writes a [`Response`](crate::Response) back and always closes the connection.

mod request_mapper;
mod response_mapper;

pub use request_mapper::MalformedRequest;
pub use request_mapper::RequestMapper;
pub use response_mapper::ResponseMapper;
