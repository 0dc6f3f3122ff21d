//! Request handling errors

use hyper::StatusCode;
use std::io;
use std::path::PathBuf;

use crate::http::identity::InvalidDateFormat;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("query must contain a non-empty path parameter")]
    MissingPathParameter,

    #[error("cannot stat {}: {source}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a regular file", .path.display())]
    NotAFile { path: PathBuf },

    #[error("cannot list directory {}: {source}", .path.display())]
    DirectoryList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    InvalidDateFormat(#[from] InvalidDateFormat),

    #[error("failed reading {}: {source}", .path.display())]
    ReadBody {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingPathParameter | Self::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotAFile { .. } => StatusCode::FORBIDDEN,
            Self::DirectoryList { source, .. } => match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::InvalidInput => StatusCode::NOT_FOUND,
                io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::ReadBody { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short identifier for access logs
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingPathParameter => "missing-path-parameter",
            Self::NotFound { .. } => "not-found",
            Self::NotAFile { .. } => "not-a-file",
            Self::DirectoryList { .. } => "directory-list",
            Self::InvalidDateFormat(_) => "invalid-date-format",
            Self::ReadBody { .. } => "read-body",
        }
    }
}
