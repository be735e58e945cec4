//! Selective reverse proxying.
//!
//! The [`ProxyForwarder`] decides what of an inbound [`Request`](crate::Request) goes upstream and
//! what of the upstream answer comes back, as described by a [`ProxyDescriptor`]. Making the
//! actual call is left to an injected [`HttpClient`]; [`RedirectFollower`] adds bounded
//! redirect following to any single-hop client.

mod client;
mod descriptor;
mod forwarder;
mod redirect;

pub use client::ClientError;
pub use client::ClientRequest;
pub use client::ClientResponse;
pub use client::HttpClient;
pub use descriptor::Forward;
pub use descriptor::ProxyDescriptor;
pub use forwarder::ProxyError;
pub use forwarder::ProxyForwarder;
pub use redirect::DEFAULT_MAX_REDIRECTS;
pub use redirect::RedirectFollower;

#[cfg(test)]
pub(crate) use client::MockHttpClient;
