//! File and directory request handling
//!
//! Turns a `?path=...&filename=...` request into a [`FileResponse`]. With an empty or absent
//! `filename` the directory at `path` is listed; otherwise the file is served subject to the
//! request's conditional headers.
//!
//! Everything here is synchronous. The router runs [`RequestHandler::handle`] on the blocking
//! pool, so one request occupies one worker until its response is complete.

use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use hyper::StatusCode;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use super::error::HandlerError;
use super::fs::{FileSystem, LocalFs};
use crate::http::conditional::{self, ConditionalHeaders, Disposition};
use crate::http::identity::FileIdentity;
use crate::http::{mime, query};
use crate::logger;

const PATH_PARAM: &str = "path";
const FILENAME_PARAM: &str = "filename";
const KEEP_ALIVE: &str = "keep-alive";

/// The parts of an incoming request the handler looks at
pub struct RequestContext<'a> {
    /// Raw query string, without the leading `?`
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    /// Build headers as for GET but leave the body out
    pub is_head: bool,
}

/// Response produced by the handler, independent of the transport
#[derive(Debug)]
pub struct FileResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Empty for 304, 412 and HEAD responses
    pub body: Bytes,
    /// Set for file requests, `None` for directory listings
    pub disposition: Option<Disposition>,
}

#[cfg(test)]
impl FileResponse {
    /// Value of the `Content-Length` header, if present and numeric
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

/// Serves directory listings and files from the filesystem it was constructed with
#[derive(Debug, Clone, Default)]
pub struct RequestHandler<F = LocalFs> {
    fs: F,
}

impl<F: FileSystem> RequestHandler<F> {
    pub const fn new(fs: F) -> Self {
        Self { fs }
    }

    pub fn handle(&self, ctx: &RequestContext<'_>) -> Result<FileResponse, HandlerError> {
        let params = query::parse_query(ctx.query);

        let dir = params
            .get(PATH_PARAM)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(HandlerError::MissingPathParameter)?;

        match params.get(FILENAME_PARAM).filter(|f| !f.is_empty()) {
            None => self.list_directory(&dir),
            Some(filename) => self.serve_file(ctx, &resolve(&dir, filename)),
        }
    }

    /// Newline-joined entry names in listing order
    fn list_directory(&self, dir: &Path) -> Result<FileResponse, HandlerError> {
        let names = self
            .fs
            .list_dir(dir)
            .map_err(|source| HandlerError::DirectoryList {
                path: dir.to_path_buf(),
                source,
            })?;
        let body = Bytes::from(names.join("\n"));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime::LISTING_CONTENT_TYPE));

        Ok(FileResponse {
            status: StatusCode::OK,
            headers,
            body,
            disposition: None,
        })
    }

    fn serve_file(
        &self,
        ctx: &RequestContext<'_>,
        path: &Path,
    ) -> Result<FileResponse, HandlerError> {
        let identity = FileIdentity::compute(&self.fs, path).map_err(|source| {
            if source.kind() == io::ErrorKind::InvalidInput {
                HandlerError::NotAFile {
                    path: path.to_path_buf(),
                }
            } else {
                HandlerError::NotFound {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let conditions = ConditionalHeaders::from_headers(ctx.headers);
        let disposition = conditional::evaluate(&conditions, &identity)?;
        if !conditions.is_empty() {
            logger::log_debug(&format!(
                "[Conditional] {} ({}, mtime {}ms, etag {}) -> {}",
                identity.name(),
                identity.absolute_path().display(),
                identity.last_modified_millis(),
                identity.etag(),
                disposition.as_str()
            ));
        }

        let mut headers = HeaderMap::new();
        echo_keep_alive(ctx.headers, &mut headers);

        let (status, body) = match disposition {
            Disposition::NotModified => {
                // The file size is advertised even though no body follows.
                headers.insert(CONTENT_LENGTH, HeaderValue::from(identity.size()));
                insert_etag(&mut headers, &identity);
                (StatusCode::NOT_MODIFIED, Bytes::new())
            }
            Disposition::PreconditionFailed => {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(identity.size()));
                (StatusCode::PRECONDITION_FAILED, Bytes::new())
            }
            Disposition::ServeFull => {
                let body = if ctx.is_head {
                    Bytes::new()
                } else {
                    self.read_file(path, identity.size())?
                };
                let length = if ctx.is_head {
                    identity.size()
                } else {
                    body.len() as u64
                };
                headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
                insert_etag(&mut headers, &identity);
                if let Ok(value) = HeaderValue::from_str(&identity.last_modified_header_value()) {
                    headers.insert(LAST_MODIFIED, value);
                }
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime::content_type_for(path)));
                (StatusCode::OK, body)
            }
        };

        Ok(FileResponse {
            status,
            headers,
            body,
            disposition: Some(disposition),
        })
    }

    /// Read the whole file; the handle is dropped before returning on every path
    fn read_file(&self, path: &Path, size_hint: u64) -> Result<Bytes, HandlerError> {
        let read_error = |source: io::Error| HandlerError::ReadBody {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = self.fs.open(path).map_err(read_error)?;
        let mut data = Vec::with_capacity(usize::try_from(size_hint).unwrap_or(0));
        reader.read_to_end(&mut data).map_err(read_error)?;
        Ok(Bytes::from(data))
    }
}

/// Join `filename` under `dir`, dropping any root or prefix so it cannot replace `dir`
fn resolve(dir: &Path, filename: &str) -> PathBuf {
    let relative: PathBuf = Path::new(filename)
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    dir.join(relative)
}

fn insert_etag(headers: &mut HeaderMap, identity: &FileIdentity) {
    if let Ok(value) = HeaderValue::from_str(&identity.etag()) {
        headers.insert(ETAG, value);
    }
}

/// Copy the first `Connection` value and every `Keep-Alive` value from the request
fn echo_keep_alive(request: &HeaderMap, response: &mut HeaderMap) {
    if let Some(connection) = request.get(CONNECTION) {
        response.insert(CONNECTION, connection.clone());
    }
    for value in request.get_all(KEEP_ALIVE) {
        response.append(KEEP_ALIVE, value.clone());
    }
}
