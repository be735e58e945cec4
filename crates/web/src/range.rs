//! `Range` request header validation.
//!
//! Only a single range is served; a request for several ranges is answered with 416
//! rather than a `multipart/byteranges` payload.

use http::header::{ACCEPT_RANGES, CONTENT_RANGE, RANGE};
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::debug;

use crate::response::Response;

/// A unit a resource can be addressed in, with the resource's total length in that unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeUnit {
    pub name: String,
    pub total_length: u64,
}

impl RangeUnit {
    pub fn bytes(total_length: u64) -> Self {
        Self { name: "bytes".to_owned(), total_length }
    }
}

/// A validated inclusive interval: `start <= end <= unit.total_length - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeValue {
    pub start: u64,
    pub end: u64,
    /// `end - start + 1`
    pub length: u64,
    pub unit: RangeUnit,
    /// The `Content-Range` value for a 206 response: `<unit> <start>-<end>/<total>`
    pub content_range: String,
}

/// The outcome of [`validate_ranges`].
#[derive(Debug)]
pub enum RangeOutcome {
    /// No `Range` header; serve the full resource
    Full,
    /// A satisfiable single range
    Partial(RangeValue),
    /// A 416 response to send as is
    Unsatisfiable(Response),
}

/// Validates the `Range` header of a request against the units a resource supports.
///
/// `Accept-Ranges` listing the unit names is set on `response_headers` before the request
/// is looked at, so it is present whatever the outcome. The 416 response carries it as well.
pub fn validate_ranges(request_headers: &HeaderMap, units: &[RangeUnit], response_headers: &mut HeaderMap) -> RangeOutcome {
    let names = units.iter().map(|unit| unit.name.as_str()).collect::<Vec<_>>().join(", ");
    if let Ok(accept_ranges) = HeaderValue::from_str(&names) {
        response_headers.insert(ACCEPT_RANGES, accept_ranges);
    }

    let Some(range) = request_headers.get(RANGE) else {
        return RangeOutcome::Full;
    };

    let Ok(range) = range.to_str() else {
        debug!("range header is not visible ascii");
        return unsatisfiable(units.first(), response_headers);
    };

    let (unit_name, ranges) = range.split_once('=').unwrap_or((range, ""));
    let Some(unit) = units.iter().find(|unit| unit.name == unit_name) else {
        debug!(unit = unit_name, "unsupported range unit");
        return unsatisfiable(units.first(), response_headers);
    };

    let specs: Vec<&str> = ranges.split(',').collect();
    let [spec] = specs.as_slice() else {
        debug!(count = specs.len(), "multiple ranges are not supported");
        return unsatisfiable(Some(unit), response_headers);
    };

    match resolve(spec.trim(), unit.total_length) {
        Some((start, end)) => RangeOutcome::Partial(RangeValue {
            start,
            end,
            length: end - start + 1,
            content_range: format!("{} {start}-{end}/{}", unit.name, unit.total_length),
            unit: unit.clone(),
        }),
        None => {
            debug!(range = spec, total_length = unit.total_length, "range not satisfiable");
            unsatisfiable(Some(unit), response_headers)
        }
    }
}

/// Resolves one range spec to an inclusive interval inside `0..total_length`.
fn resolve(spec: &str, total_length: u64) -> Option<(u64, u64)> {
    let (start, end) = spec.split_once('-')?;
    let last = total_length.checked_sub(1)?;

    let (start, end) = match (parse_position(start), parse_position(end)) {
        (Some(start), None) if end.is_empty() => (start, last),
        (None, Some(suffix)) if start.is_empty() => (total_length.checked_sub(suffix)?, last),
        (Some(start), Some(end)) => (start, end),
        _ => return None,
    };

    (start <= end && end <= last).then_some((start, end))
}

fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn unsatisfiable(unit: Option<&RangeUnit>, response_headers: &HeaderMap) -> RangeOutcome {
    let content_range = match unit {
        Some(unit) => format!("{} */{}", unit.name, unit.total_length),
        None => "* */*".to_owned(),
    };

    let mut builder = Response::builder().status(StatusCode::RANGE_NOT_SATISFIABLE);
    if let Ok(content_range) = HeaderValue::from_str(&content_range) {
        builder = builder.header(CONTENT_RANGE, content_range);
    }
    if let Some(accept_ranges) = response_headers.get(ACCEPT_RANGES) {
        builder = builder.header(ACCEPT_RANGES, accept_ranges.clone());
    }
    RangeOutcome::Unsatisfiable(builder.build())
}
