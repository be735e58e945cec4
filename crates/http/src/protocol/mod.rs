//! Protocol types shared by the codec and the connection layer.
//!
//! - [`Message`], [`PayloadItem`] and [`PayloadSize`] describe what flows through the codec
//! - [`RequestHead`] and [`ResponseHead`] are the parsed and to-be-written message heads
//! - [`ReqBody`] streams the payload of the request being served
//! - [`ParseError`] and [`SendError`] report failures on either side

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
pub use body::ReqBody;
