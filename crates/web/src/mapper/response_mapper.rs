use http::header::{CONTENT_LENGTH, InvalidHeaderValue, SET_COOKIE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use strand_http::connection::ResponseWriter;
use strand_http::protocol::{PayloadSize, SendError};
use thiserror::Error;
use tokio::io::AsyncWrite;
use tracing::{debug, error};

use crate::body::{Body, BoxError};
use crate::response::{Response, ResponseParts};

#[derive(Debug, Error)]
enum WriteError {
    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("response body error: {source}")]
    Body { source: BoxError },

    #[error("invalid cookie {name}: {source}")]
    Cookie {
        name: String,
        #[source]
        source: InvalidHeaderValue,
    },

    #[error("invalid content-length header")]
    ContentLength,
}

/// Writes a [`Response`] onto a connection's [`ResponseWriter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMapper;

impl ResponseMapper {
    pub fn new() -> Self {
        Self
    }

    /// Writes `response`, then closes the connection.
    ///
    /// Headers are appended to whatever the writer already staged. The body is piped chunk
    /// by chunk; it is skipped when `method` is `HEAD`. Failures are not returned: before the
    /// head is out they turn into a bodiless 500 carrying only the headers staged before this
    /// call, after it the connection is just closed.
    pub async fn write<W>(&self, response: Response, mut writer: ResponseWriter<W>, method: Option<&Method>)
    where
        W: AsyncWrite + Unpin,
    {
        let is_head = method == Some(&Method::HEAD);
        let base_headers = writer.headers().clone();
        if let Err(e) = write_response(response, &mut writer, is_head).await {
            if writer.is_head_sent() {
                error!(cause = %e, "write response error after head sent, closing connection");
            } else {
                error!(cause = %e, "write response error, sending 500");
                *writer.headers_mut() = base_headers;
                send_internal_error(&mut writer).await;
            }
        }

        if let Err(e) = writer.close().await {
            debug!(cause = %e, "close connection error");
        }
    }
}

async fn write_response<W>(response: Response, writer: &mut ResponseWriter<W>, is_head: bool) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    let ResponseParts { status, status_message, headers, cookies, body } = response.into_parts();

    let staged = writer.headers_mut();
    for (name, value) in &headers {
        staged.append(name.clone(), value.clone());
    }
    for (name, directive) in &cookies {
        let set_cookie = HeaderValue::from_str(&directive.to_set_cookie(name))
            .map_err(|source| WriteError::Cookie { name: name.clone(), source })?;
        staged.append(SET_COOKIE, set_cookie);
    }

    let body = match body {
        Some(body) if is_head => {
            if !staged.contains_key(CONTENT_LENGTH)
                && let Some(length) = body.size_hint().exact()
            {
                staged.insert(CONTENT_LENGTH, HeaderValue::from(length));
            }
            None
        }
        body => body,
    };

    let payload_size = match &body {
        None => PayloadSize::Empty,
        Some(body) => payload_size(staged, body)?,
    };

    writer.send_head(status, status_message.as_deref(), payload_size).await?;

    match body {
        Some(body) if !payload_size.is_empty() => pipe(body, writer).await,
        _ => Ok(()),
    }
}

/// A declared `Content-Length` wins over what the body reports.
fn payload_size(headers: &HeaderMap, body: &Body) -> Result<PayloadSize, WriteError> {
    if let Some(content_length) = headers.get(CONTENT_LENGTH) {
        let length = content_length
            .to_str()
            .ok()
            .and_then(|length| length.trim().parse::<u64>().ok())
            .ok_or(WriteError::ContentLength)?;
        return Ok(PayloadSize::new_length(length));
    }

    Ok(match body.size_hint().exact() {
        Some(length) => PayloadSize::new_length(length),
        None => PayloadSize::new_chunked(),
    })
}

async fn pipe<W>(mut body: Body, writer: &mut ResponseWriter<W>) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|source| WriteError::Body { source })?;
        if let Ok(data) = frame.into_data() {
            writer.send_data(data).await?;
        }
    }
    writer.send_eof().await?;
    Ok(())
}

async fn send_internal_error<W>(writer: &mut ResponseWriter<W>)
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = writer.send_head(StatusCode::INTERNAL_SERVER_ERROR, None, PayloadSize::Empty).await {
        error!(cause = %e, "send 500 response error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::{CookieDirective, CookieOptions};
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http_body_util::StreamBody;
    use http_body::Frame;
    use std::io;
    use tokio::io::{AsyncReadExt, DuplexStream};

    async fn written(response: Response, method: Method) -> String {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        ResponseMapper::new().write(response, ResponseWriter::new(server), Some(&method)).await;
        read_all(&mut client).await
    }

    async fn read_all(client: &mut DuplexStream) -> String {
        let mut raw = String::new();
        client.read_to_string(&mut raw).await.unwrap();
        raw
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn text_response() {
        let raw = written(Response::text("hello", StatusCode::OK), Method::GET).await;

        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("content-type: text/plain; charset=utf-8\r\n"));
        assert!(raw.contains("content-length: 5\r\n"));
        assert!(raw.contains("connection: close\r\n"));
        assert!(raw.ends_with("\r\n\r\nhello"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn custom_status_message() {
        let response = Response::builder().status(StatusCode::IM_A_TEAPOT).status_message("Short And Stout").build();

        let raw = written(response, Method::GET).await;

        assert!(raw.starts_with("HTTP/1.1 418 Short And Stout\r\n"));
        assert!(raw.contains("content-length: 0\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn headers_and_cookies_are_appended() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let mut writer = ResponseWriter::new(server);
        writer.headers_mut().append(SET_COOKIE, HeaderValue::from_static("staged=1"));

        let response = Response::builder()
            .header(http::header::VARY, HeaderValue::from_static("accept"))
            .header(http::header::VARY, HeaderValue::from_static("cookie"))
            .cookie("session", CookieDirective::set_with("abc", CookieOptions::bare()))
            .cookie("old", CookieDirective::delete_with(CookieOptions::bare()))
            .build();
        ResponseMapper::new().write(response, writer, None).await;
        let raw = read_all(&mut client).await;

        assert!(raw.contains("set-cookie: staged=1\r\n"));
        assert!(raw.contains("set-cookie: session=abc\r\n"));
        assert!(raw.contains("set-cookie: old=; Max-Age=-1\r\n"));
        assert!(raw.contains("vary: accept\r\n"));
        assert!(raw.contains("vary: cookie\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn streamed_body_is_chunked() {
        let chunks: Vec<Result<_, io::Error>> =
            vec![Ok(Frame::data(Bytes::from_static(b"abc"))), Ok(Frame::data(Bytes::from_static(b"de")))];
        let body = Body::stream(StreamBody::new(futures::stream::iter(chunks)));
        let response = Response::builder().body(body).build();

        let raw = written(response, Method::GET).await;

        assert!(raw.contains("transfer-encoding: chunked\r\n"));
        assert!(raw.ends_with("\r\n\r\n3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn head_keeps_length_and_drops_body() {
        let raw = written(Response::text("hello", StatusCode::OK), Method::HEAD).await;

        assert!(raw.contains("content-length: 5\r\n"));
        assert!(raw.ends_with("\r\n\r\n"));
        assert!(!raw.contains("hello"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn body_error_before_head_is_500() {
        let response = Response::builder()
            .header(CONTENT_LENGTH, HeaderValue::from_static("not a number"))
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .body(Body::from("x"))
            .build();

        let raw = written(response, Method::GET).await;

        assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(raw.contains("content-length: 0\r\n"));
        assert!(!raw.contains("content-type"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn failed_response_headers_do_not_reach_500() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let mut writer = ResponseWriter::new(server);
        writer.headers_mut().insert(http::header::REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

        let response = Response::builder()
            .status(StatusCode::FOUND)
            .header(http::header::LOCATION, HeaderValue::from_static("/elsewhere"))
            .header(CONTENT_LENGTH, HeaderValue::from_static("not a number"))
            .cookie("session", CookieDirective::set_with("abc", CookieOptions::bare()))
            .body(Body::from("x"))
            .build();
        ResponseMapper::new().write(response, writer, None).await;
        let raw = read_all(&mut client).await;

        assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(raw.contains("referrer-policy: no-referrer\r\n"));
        assert!(!raw.contains("location"));
        assert!(!raw.contains("set-cookie"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn body_error_after_head_closes() {
        let chunks: Vec<Result<_, io::Error>> =
            vec![Ok(Frame::data(Bytes::from_static(b"abc"))), Err(io::Error::other("disk gone"))];
        let body = Body::stream(StreamBody::new(futures::stream::iter(chunks)));
        let response = Response::builder().body(body).build();

        let raw = written(response, Method::GET).await;

        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.ends_with("\r\n\r\n3\r\nabc\r\n"));
    }
}
