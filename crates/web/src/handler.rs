use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::body::BoxError;
use crate::request::Request;
use crate::response::Response;

/// Application code behind the server.
///
/// `Ok(None)` means no route matched and is answered with 404; an error is logged and
/// answered with a bodiless 500.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Option<Response>, BoxError>;
}

#[async_trait]
impl<H> RequestHandler for Arc<H>
where
    H: RequestHandler + ?Sized,
{
    async fn handle(&self, request: Request) -> Result<Option<Response>, BoxError> {
        (**self).handle(request).await
    }
}

/// a [`RequestHandler`] backed by an async fn
pub struct FnHandler<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response>, BoxError>> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response>, BoxError>> + Send,
{
    async fn handle(&self, request: Request) -> Result<Option<Response>, BoxError> {
        (self.f)(request).await
    }
}
