//! HTTP response building module
//!
//! Converts handler output and errors into hyper responses.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use crate::handler::FileResponse;

/// Build a plain-text error response whose body is the status line plus a detail message
pub fn build_error_response(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = if detail.is_empty() {
        format!("{} {reason}", status.as_u16())
    } else {
        format!("{} {reason}: {detail}", status.as_u16())
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, body.len())
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback(status)
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    let mut response = build_error_response(StatusCode::METHOD_NOT_ALLOWED, "");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

/// Build the wire response for a handler result
///
/// 412 is a status that carries a body, so an advertised length without bytes behind it
/// would desynchronize the connection; it goes out with `Content-Length: 0`. A 304 keeps the
/// file length here, but hyper's HTTP/1 encoder strips `Content-Length` from 304 responses,
/// so it never reaches the client.
pub fn build_file_response(file: FileResponse) -> Response<Full<Bytes>> {
    let FileResponse {
        status,
        mut headers,
        body,
        ..
    } = file;

    if status == StatusCode::PRECONDITION_FAILED {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(0u64));
    }

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn fallback(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
