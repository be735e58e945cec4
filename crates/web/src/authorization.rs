use http::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, StatusCode};

use crate::body::Body;
use crate::request::Request;
use crate::response::Response;

/// The result of [`authorization_parameters`].
#[derive(Debug)]
pub enum Authorization {
    /// Everything after the scheme, e.g. the token of a `Bearer` header
    Parameters(String),
    /// The 401 or 400 to answer with
    Rejected(Response),
}

/// Extracts the parameters of an `Authorization` header using `scheme`.
///
/// A missing header is a 401 challenging with `scheme` and `challenge_parameters`; a header
/// with another scheme, or with nothing after the scheme, is a 400.
pub fn authorization_parameters(request: &Request, scheme: &str, challenge_parameters: Option<&str>) -> Authorization {
    let Some(authorization) = request.header(AUTHORIZATION) else {
        let challenge = match challenge_parameters {
            Some(parameters) => format!("{scheme} {parameters}"),
            None => scheme.to_owned(),
        };
        let mut response = Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
            .body(Body::from("Authorization needed"));
        if let Ok(challenge) = HeaderValue::from_str(&challenge) {
            response = response.header(WWW_AUTHENTICATE, challenge);
        }
        return Authorization::Rejected(response.build());
    };

    let Some(parameters) = authorization.strip_prefix(scheme).and_then(|rest| rest.strip_prefix(' ')) else {
        return Authorization::Rejected(Response::text("Invalid authorization schema", StatusCode::BAD_REQUEST));
    };

    if parameters.is_empty() {
        return Authorization::Rejected(Response::text("Invalid authorization parameters", StatusCode::BAD_REQUEST));
    }

    Authorization::Parameters(parameters.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use url::Url;

    fn request(authorization: Option<&'static str>) -> Request {
        let mut builder = Request::builder(Method::GET, Url::parse("http://localhost/").unwrap());
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, HeaderValue::from_static(authorization));
        }
        builder.build()
    }

    fn rejected(authorization: Authorization) -> Response {
        match authorization {
            Authorization::Rejected(response) => response,
            Authorization::Parameters(parameters) => panic!("unexpected parameters {parameters}"),
        }
    }

    #[test]
    fn missing_header_challenges() {
        let response = rejected(authorization_parameters(&request(None), "Basic", Some("realm=\"api\"")));

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], "Basic realm=\"api\"");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn wrong_scheme() {
        let response = rejected(authorization_parameters(&request(Some("Bearer abc")), "Basic", None));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = rejected(authorization_parameters(&request(Some("Basicabc")), "Basic", None));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_parameters() {
        let response = rejected(authorization_parameters(&request(Some("Basic ")), "Basic", None));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parameters_keep_inner_spaces() {
        match authorization_parameters(&request(Some("Custom a b  c")), "Custom", None) {
            Authorization::Parameters(parameters) => assert_eq!(parameters, "a b  c"),
            Authorization::Rejected(response) => panic!("unexpected rejection {}", response.status()),
        }
    }
}
