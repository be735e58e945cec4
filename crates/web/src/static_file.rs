use std::io;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use mime::Mime;
use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tracing::{debug, warn};
use url::Url;

use crate::body::Body;
use crate::mime_lookup::{ExtensionMimeLookup, MimeLookup};
use crate::range::{RangeOutcome, RangeUnit, RangeValue, validate_ranges};
use crate::request::Request;
use crate::response::Response;

/// Serves files from the filesystem, honouring single byte ranges.
///
/// File contents are streamed from an open handle, never read into memory up front.
#[derive(Clone)]
pub struct StaticFileResponder {
    mime_lookup: Arc<dyn MimeLookup>,
    directory_redirect: StatusCode,
}

impl std::fmt::Debug for StaticFileResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticFileResponder").field("directory_redirect", &self.directory_redirect).finish_non_exhaustive()
    }
}

impl Default for StaticFileResponder {
    fn default() -> Self {
        Self::new(ExtensionMimeLookup)
    }
}

impl StaticFileResponder {
    pub fn new<M: MimeLookup + 'static>(mime_lookup: M) -> Self {
        Self { mime_lookup: Arc::new(mime_lookup), directory_redirect: StatusCode::FOUND }
    }

    /// Status of the trailing-slash redirect for directories, `302 Found` unless changed.
    ///
    /// Only `301` and `302` are accepted; anything else leaves the current status in place.
    #[must_use]
    pub fn with_directory_redirect(mut self, status: StatusCode) -> Self {
        if matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND) {
            self.directory_redirect = status;
        } else {
            warn!(%status, "ignoring directory redirect status, expected 301 or 302");
        }
        self
    }

    /// Serves `path` relative to `root`, rejecting paths that could escape it.
    ///
    /// A `path` containing `..`, `//` or a backslash is answered with a 400 "Invalid path!".
    /// Otherwise its leading `/` is dropped and the result is served by [`respond`](Self::respond).
    pub async fn respond_filtered<P: AsRef<Path>>(
        &self,
        root: P,
        path: &str,
        request: &Request,
        content_type: Option<Mime>,
        extra_headers: Option<HeaderMap>,
    ) -> Response {
        if path.contains("..") || path.contains("//") || path.contains('\\') {
            debug!(path, "rejected static file path");
            return Response::text("Invalid path!", StatusCode::BAD_REQUEST);
        }

        let relative = path.strip_prefix('/').unwrap_or(path);
        self.respond(root.as_ref().join(relative), request, content_type, extra_headers).await
    }

    /// Builds the response for the file at `path`.
    ///
    /// - a missing path, or one that is neither a file nor a directory, is a 404
    /// - a directory is a 404 when `content_type` is forced; otherwise a request URL without a
    ///   trailing slash is redirected to one, and with it `index.html` inside is served
    /// - a file is a 200, or a 206 for a satisfiable `Range`, or the 416 from range validation
    ///
    /// `extra_headers` are merged last and replace headers of the same name.
    pub async fn respond<P: AsRef<Path>>(
        &self,
        path: P,
        request: &Request,
        content_type: Option<Mime>,
        extra_headers: Option<HeaderMap>,
    ) -> Response {
        let mut path = path.as_ref().to_path_buf();
        loop {
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!(cause = %e, path = %path.display(), "can't stat static file");
                    }
                    return not_found();
                }
            };

            if metadata.is_dir() {
                if content_type.is_some() {
                    debug!(path = %path.display(), "forced content type on a directory");
                    return not_found();
                }
                if !request.url().path().ends_with('/') {
                    return Response::redirect(directory_location(request.url()).as_str(), self.directory_redirect);
                }
                path.push("index.html");
                continue;
            }

            if !metadata.is_file() {
                return not_found();
            }

            return self.file_response(path, metadata.len(), request, content_type, extra_headers).await;
        }
    }

    async fn file_response(
        &self,
        path: PathBuf,
        size: u64,
        request: &Request,
        content_type: Option<Mime>,
        extra_headers: Option<HeaderMap>,
    ) -> Response {
        let mut headers = HeaderMap::new();
        let range = match validate_ranges(request.headers(), &[RangeUnit::bytes(size)], &mut headers) {
            RangeOutcome::Full => None,
            RangeOutcome::Partial(range) => Some(range),
            RangeOutcome::Unsatisfiable(response) => return response,
        };

        let (status, start, length) = match &range {
            Some(RangeValue { start, length, .. }) => (StatusCode::PARTIAL_CONTENT, *start, *length),
            None => (StatusCode::OK, 0, size),
        };

        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        if let Some(range) = &range
            && let Ok(content_range) = HeaderValue::from_str(&range.content_range)
        {
            headers.insert(CONTENT_RANGE, content_range);
        }
        let content_type = content_type.or_else(|| self.mime_lookup.lookup(&path));
        if let Some(content_type) = content_type
            && let Ok(content_type) = HeaderValue::from_str(content_type.as_ref())
        {
            headers.insert(CONTENT_TYPE, content_type);
        }

        let mut builder = Response::builder().status(status).merge_headers(headers);
        if let Some(extra_headers) = extra_headers {
            builder = builder.merge_headers(extra_headers);
        }

        if request.method() == Method::HEAD {
            return builder.build();
        }

        match open_at(&path, start).await {
            Ok(file) => builder.body(Body::from_reader(file, length)).build(),
            Err(e) => {
                warn!(cause = %e, path = %path.display(), "can't open static file");
                not_found()
            }
        }
    }
}

async fn open_at(path: &Path, start: u64) -> io::Result<File> {
    let mut file = File::open(path).await?;
    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    Ok(file)
}

fn directory_location(url: &Url) -> Url {
    let mut location = url.clone();
    location.set_path(&format!("{}/", url.path()));
    location.set_fragment(None);
    location
}

fn not_found() -> Response {
    Response::text("File not found", StatusCode::NOT_FOUND)
}
