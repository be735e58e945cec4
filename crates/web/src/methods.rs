use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};

use crate::request::Request;
use crate::response::Response;

/// Checks the request method against the methods a route accepts.
///
/// Returns the response to send instead of routing further:
/// - 405 for a method not in `methods`, with `Allow` if `OPTIONS` is among them
/// - 204 with `Allow` for an `OPTIONS` request the route accepts
///
/// and `None` when the request should be handled.
pub fn validate_methods(request: &Request, methods: &[Method]) -> Option<Response> {
    let allow = || {
        let names = methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
        HeaderValue::from_str(&names).ok()
    };

    if !methods.contains(request.method()) {
        let mut builder = Response::builder().status(StatusCode::METHOD_NOT_ALLOWED);
        if methods.contains(&Method::OPTIONS)
            && let Some(allow) = allow()
        {
            builder = builder.header(ALLOW, allow);
        }
        return Some(builder.build());
    }

    if request.method() == Method::OPTIONS {
        let mut builder = Response::builder().status(StatusCode::NO_CONTENT);
        if let Some(allow) = allow() {
            builder = builder.header(ALLOW, allow);
        }
        return Some(builder.build());
    }

    None
}
