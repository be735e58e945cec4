//! Cached `Date` header value.
//!
//! Formatting the date for every response is wasted work when it only changes once a second,
//! so a background task refreshes a shared value instead. Each [`Pipeline`](super::Pipeline)
//! owns its service, the task is aborted when the pipeline is dropped.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwap;
use http::HeaderValue;

pub(crate) struct DateService {
    current: Arc<ArcSwap<HeaderValue>>,
    handle: tokio::task::JoinHandle<()>,
}

const UPDATE_INTERVAL: Duration = Duration::from_millis(800);

impl DateService {
    /// Spawns the refresh task on the current tokio runtime.
    pub(crate) fn new() -> Self {
        Self::new_with_update_interval(UPDATE_INTERVAL)
    }

    pub(crate) fn new_with_update_interval(update_interval: Duration) -> Self {
        let current = Arc::new(ArcSwap::from_pointee(now()));
        let current_arc = Arc::clone(&current);

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(update_interval).await;
                current_arc.store(Arc::new(now()));
            }
        });

        DateService { current, handle }
    }

    pub(crate) fn http_date(&self) -> HeaderValue {
        self.current.load().as_ref().clone()
    }
}

impl Drop for DateService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn now() -> HeaderValue {
    let date = httpdate::fmt_http_date(SystemTime::now());
    // an IMF-fixdate is plain ascii
    HeaderValue::try_from(date).unwrap_or(HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn formats_imf_fixdate() {
        let service = DateService::new_with_update_interval(Duration::from_millis(10));

        let date = service.http_date();
        let parsed = httpdate::parse_http_date(date.to_str().unwrap()).unwrap();
        let drift = SystemTime::now().duration_since(parsed).unwrap_or_default();
        assert!(drift < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn dropping_stops_refresh_task() {
        let service = DateService::new();
        let handle = service.handle.abort_handle();

        drop(service);
        let finished = tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await;

        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn refreshes() {
        let service = DateService::new_with_update_interval(Duration::from_millis(10));
        let first = httpdate::parse_http_date(service.http_date().to_str().unwrap()).unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;

        let second = httpdate::parse_http_date(service.http_date().to_str().unwrap()).unwrap();
        assert!(second > first);
    }
}
