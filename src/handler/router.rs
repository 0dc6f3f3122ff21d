//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, prefix matching, and handing
//! the request to the file handler on the blocking pool.

use crate::config::AppState;
use crate::handler::{HandlerError, RequestContext};
use crate::http;
use crate::http::conditional::Disposition;
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue, REFERER, SERVER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// What the access log records about a request besides the response itself
#[derive(Default)]
struct Outcome {
    disposition: Option<&'static str>,
    error: Option<&'static str>,
}

/// Main entry point for HTTP request handling
///
/// The request body is never read.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();

    let (mut response, outcome) = route(&parts, &state).await;

    if let Ok(value) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, value);
    }

    if state.config.logging.access_log {
        log_access(&parts, &response, &outcome, &state, peer_addr, started);
    }

    Ok(response)
}

async fn route(parts: &Parts, state: &Arc<AppState>) -> (Response<Full<Bytes>>, Outcome) {
    // 1. Check HTTP method
    if let Some(resp) = check_http_method(&parts.method) {
        return (resp, Outcome::default());
    }

    // 2. Check the path is ours
    if !state.matches_prefix(parts.uri.path()) {
        let resp = http::build_error_response(StatusCode::NOT_FOUND, parts.uri.path());
        return (resp, Outcome::default());
    }

    // 3. Run the handler on the blocking pool
    let query = parts.uri.query().map(ToString::to_string);
    let headers = parts.headers.clone();
    let is_head = parts.method == Method::HEAD;
    let worker_state = Arc::clone(state);

    let result = tokio::task::spawn_blocking(move || {
        let ctx = RequestContext {
            query: query.as_deref(),
            headers: &headers,
            is_head,
        };
        worker_state.handler.handle(&ctx)
    })
    .await;

    match result {
        Ok(Ok(file)) => {
            let outcome = Outcome {
                disposition: file.disposition.map(Disposition::as_str),
                error: None,
            };
            (http::build_file_response(file), outcome)
        }
        Ok(Err(err)) => (error_response(&err), Outcome {
            disposition: None,
            error: Some(err.kind()),
        }),
        Err(join_err) => {
            logger::log_error(&format!("Request worker failed: {join_err}"));
            let resp = http::build_error_response(StatusCode::INTERNAL_SERVER_ERROR, "");
            (resp, Outcome {
                disposition: None,
                error: Some("worker-failed"),
            })
        }
    }
}

/// Check HTTP method and return 405 for anything but GET/HEAD
fn check_http_method(method: &Method) -> Option<Response<Full<Bytes>>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Method not allowed: {method}"));
            Some(http::build_405_response())
        }
    }
}

fn error_response(err: &HandlerError) -> Response<Full<Bytes>> {
    let status = err.status();
    if status.is_server_error() {
        logger::log_error(&err.to_string());
    } else {
        logger::log_debug(&err.to_string());
    }
    http::build_error_response(status, &err.to_string())
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    outcome: &Outcome,
    state: &AppState,
    peer_addr: SocketAddr,
    started: Instant,
) {
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = http_version(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = usize::try_from(hyper::body::Body::size_hint(response.body()).lower())
        .unwrap_or(usize::MAX);
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry.disposition = outcome.disposition;
    entry.error = outcome.error;

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

const fn http_version(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
