use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, LOCATION, TRANSFER_ENCODING};
use http::{HeaderMap, Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::proxy::client::{ClientError, ClientRequest, ClientResponse, HttpClient};

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Follows redirects on top of a client that makes single requests.
///
/// `301`, `302` and `303` switch a `POST` (any method, for `303`) to a bodiless `GET`;
/// `307` and `308` repeat the request as it was, which is impossible once its body
/// was streamed, so such a redirect is returned as the final response. Credentials are
/// not carried over to another origin.
#[derive(Debug)]
pub struct RedirectFollower<C> {
    inner: C,
    max_redirects: usize,
}

impl<C> RedirectFollower<C> {
    pub fn new(inner: C) -> Self {
        Self::with_max_redirects(inner, DEFAULT_MAX_REDIRECTS)
    }

    pub fn with_max_redirects(inner: C, max_redirects: usize) -> Self {
        Self { inner, max_redirects }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for RedirectFollower<C> {
    async fn request(&self, mut request: ClientRequest) -> Result<ClientResponse, ClientError> {
        let follow = request.follow_redirects;
        let assert_status_ok = request.assert_status_ok;
        request.follow_redirects = false;
        request.assert_status_ok = false;

        let mut redirects = 0;
        loop {
            let url = request.url.clone();
            let method = request.effective_method();
            let headers = request.headers.clone();
            let server_certificate = request.server_certificate.clone();
            let had_body = request.body.is_some();

            let response = self.inner.request(request).await?;
            if !follow {
                return finish(response, assert_status_ok, true);
            }

            let Some(next_method) = next_method(response.status, &method, had_body) else {
                return finish(response, assert_status_ok, false);
            };
            let Some(location) = response.headers.get(LOCATION) else {
                return finish(response, assert_status_ok, false);
            };

            if redirects == self.max_redirects {
                warn!(max = self.max_redirects, %url, "too many redirects");
                return Err(ClientError::TooManyRedirects { max: self.max_redirects });
            }
            redirects += 1;

            let next_url = location.to_str().ok().and_then(|location| url.join(location).ok()).ok_or_else(|| {
                ClientError::InvalidRedirect { location: String::from_utf8_lossy(location.as_bytes()).into_owned() }
            })?;
            debug!(status = response.status.as_u16(), from = %url, to = %next_url, "follow redirect");

            let headers = redirected_headers(headers, &url, &next_url, next_method != method);
            request = ClientRequest {
                url: next_url,
                method: Some(next_method),
                headers,
                body: None,
                follow_redirects: false,
                assert_status_ok: false,
                server_certificate,
            };
        }
    }
}

/// The method to follow a redirect with, `None` if the response is to be returned.
fn next_method(status: StatusCode, method: &Method, had_body: bool) -> Option<Method> {
    match status {
        StatusCode::SEE_OTHER if *method == Method::HEAD => Some(Method::HEAD),
        StatusCode::SEE_OTHER => Some(Method::GET),
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND if *method == Method::POST => Some(Method::GET),
        StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => Some(method.clone()),
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT if had_body => None,
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => Some(method.clone()),
        _ => None,
    }
}

fn redirected_headers(mut headers: HeaderMap, from: &Url, to: &Url, method_changed: bool) -> HeaderMap {
    if method_changed {
        for name in [CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING] {
            headers.remove(name);
        }
    }
    if from.origin() != to.origin() {
        headers.remove(AUTHORIZATION);
        headers.remove(COOKIE);
    }
    headers
}

/// A redirect handed back unfollowed is never a failure.
fn finish(response: ClientResponse, assert_status_ok: bool, redirects_passed_through: bool) -> Result<ClientResponse, ClientError> {
    let acceptable = response.status.is_success() || (redirects_passed_through && response.status.is_redirection());
    if assert_status_ok && !acceptable {
        return Err(ClientError::UpstreamStatus(Box::new(response)));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::proxy::client::MockHttpClient;
    use http::HeaderValue;

    fn redirect_to(status: StatusCode, location: &'static str) -> ClientResponse {
        let mut response = ClientResponse::new(status);
        response.headers.insert(LOCATION, HeaderValue::from_static(location));
        response
    }

    fn request(url: &str) -> ClientRequest {
        ClientRequest::new(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn follows_relative_location() {
        let mut client = MockHttpClient::new();
        client
            .expect_request()
            .withf(|request| request.url.as_str() == "http://upstream/old")
            .times(1)
            .returning(|_| Ok(redirect_to(StatusCode::MOVED_PERMANENTLY, "/new?x=1")));
        client
            .expect_request()
            .withf(|request| request.url.as_str() == "http://upstream/new?x=1" && !request.follow_redirects)
            .times(1)
            .returning(|_| Ok(ClientResponse::new(StatusCode::OK)));

        let response = RedirectFollower::new(client).request(request("http://upstream/old")).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn see_other_switches_to_get() {
        let mut client = MockHttpClient::new();
        client
            .expect_request()
            .withf(|request| request.method == Some(Method::POST))
            .times(1)
            .returning(|_| Ok(redirect_to(StatusCode::SEE_OTHER, "http://upstream/done")));
        client
            .expect_request()
            .withf(|request| {
                request.method == Some(Method::GET) && request.body.is_none() && !request.headers.contains_key(CONTENT_TYPE)
            })
            .times(1)
            .returning(|_| Ok(ClientResponse::new(StatusCode::OK)));

        let mut post = request("http://upstream/form");
        post.method = Some(Method::POST);
        post.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        post.body = Some(Body::from("a=1"));

        let response = RedirectFollower::new(client).request(post).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn temporary_redirect_with_streamed_body_is_returned() {
        let mut client = MockHttpClient::new();
        client
            .expect_request()
            .times(1)
            .returning(|_| Ok(redirect_to(StatusCode::TEMPORARY_REDIRECT, "/elsewhere")));

        let mut put = request("http://upstream/upload");
        put.method = Some(Method::PUT);
        put.body = Some(Body::from("data"));

        let response = RedirectFollower::new(client).request(put).await.unwrap();

        assert_eq!(response.status, StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn redirect_loop_is_capped() {
        let mut client = MockHttpClient::new();
        client
            .expect_request()
            .times(4)
            .returning(|_| Ok(redirect_to(StatusCode::FOUND, "/again")));

        let result = RedirectFollower::with_max_redirects(client, 3).request(request("http://upstream/")).await;

        assert!(matches!(result, Err(ClientError::TooManyRedirects { max: 3 })));
    }

    #[tokio::test]
    async fn credentials_stay_on_origin() {
        let mut client = MockHttpClient::new();
        client
            .expect_request()
            .withf(|request| request.url.host_str() == Some("upstream"))
            .times(1)
            .returning(|_| Ok(redirect_to(StatusCode::FOUND, "http://other/")));
        client
            .expect_request()
            .withf(|request| request.url.host_str() == Some("other") && !request.headers.contains_key(AUTHORIZATION))
            .times(1)
            .returning(|_| Ok(ClientResponse::new(StatusCode::OK)));

        let mut get = request("http://upstream/");
        get.headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));

        assert!(RedirectFollower::new(client).request(get).await.is_ok());
    }

    #[tokio::test]
    async fn not_following_passes_redirect_through() {
        let mut client = MockHttpClient::new();
        client.expect_request().times(1).returning(|_| Ok(redirect_to(StatusCode::FOUND, "/next")));

        let mut get = request("http://upstream/");
        get.follow_redirects = false;
        get.assert_status_ok = true;

        let response = RedirectFollower::new(client).request(get).await.unwrap();

        assert_eq!(response.status, StatusCode::FOUND);
    }

    #[tokio::test]
    async fn asserted_status_rejects_errors() {
        let mut client = MockHttpClient::new();
        client.expect_request().times(1).returning(|_| Ok(ClientResponse::new(StatusCode::BAD_GATEWAY)));

        let mut get = request("http://upstream/");
        get.assert_status_ok = true;

        let result = RedirectFollower::new(client).request(get).await;

        match result {
            Err(ClientError::UpstreamStatus(response)) => assert_eq!(response.status, StatusCode::BAD_GATEWAY),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
