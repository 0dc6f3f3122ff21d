//! Conditional request evaluation
//!
//! Decides between serving a file, answering `304 Not Modified` or answering
//! `412 Precondition Failed`, based on the request's validator headers.
//!
//! Precedence is fixed: `If-None-Match`, then `If-Modified-Since`, then `If-Match`.
//! Only the first header present is consulted.

use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH,
};

use super::identity::{FileIdentity, InvalidDateFormat};

/// How a file request should be answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    ServeFull,
    NotModified,
    PreconditionFailed,
}

impl Disposition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServeFull => "serve-full",
            Self::NotModified => "not-modified",
            Self::PreconditionFailed => "precondition-failed",
        }
    }
}

/// Validator headers extracted from a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    /// First `If-None-Match` value, compared verbatim
    pub if_none_match: Option<String>,
    /// First `If-Modified-Since` value
    pub if_modified_since: Option<String>,
    /// All `If-Match` values, one per comma-separated entry; `None` when the header is absent
    pub if_match: Option<Vec<String>>,
}

impl ConditionalHeaders {
    /// Extract validator headers
    ///
    /// A header counts as present whatever bytes it carries. Non-UTF-8 bytes become U+FFFD,
    /// which can never equal an `ETag` and never parses as a date, so such values still take
    /// part in evaluation instead of being skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let first = |name: HeaderName| headers.get(name).map(lossy);

        let if_match: Vec<String> = headers
            .get_all(IF_MATCH)
            .iter()
            .flat_map(|v| {
                lossy(v)
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();

        Self {
            if_none_match: first(IF_NONE_MATCH),
            if_modified_since: first(IF_MODIFIED_SINCE),
            if_match: headers.contains_key(IF_MATCH).then_some(if_match),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none() && self.if_match.is_none()
    }
}

fn lossy(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

/// Evaluate the validator headers against the file's current identity
///
/// `If-None-Match` uses exact string equality with no weak-tag handling. A `*` in `If-Match`
/// always fails the precondition. An unparseable `If-Modified-Since` is returned as an error
/// instead of being ignored.
pub fn evaluate(
    headers: &ConditionalHeaders,
    identity: &FileIdentity,
) -> Result<Disposition, InvalidDateFormat> {
    if let Some(if_none_match) = &headers.if_none_match {
        return Ok(if *if_none_match == identity.etag() {
            Disposition::NotModified
        } else {
            Disposition::ServeFull
        });
    }

    if let Some(since) = &headers.if_modified_since {
        return Ok(if identity.is_newer_than(since)? {
            Disposition::ServeFull
        } else {
            Disposition::NotModified
        });
    }

    if let Some(tags) = &headers.if_match {
        let etag = identity.etag();
        return Ok(if tags.iter().any(|t| t == "*") || !tags.contains(&etag) {
            Disposition::PreconditionFailed
        } else {
            Disposition::ServeFull
        });
    }

    Ok(Disposition::ServeFull)
}
