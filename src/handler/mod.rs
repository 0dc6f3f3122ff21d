//! Request handler module
//!
//! `files` holds the transport-independent file/listing logic; `router` adapts it to hyper.

pub mod error;
pub mod files;
pub mod fs;
pub mod router;

pub use error::HandlerError;
pub use files::{FileResponse, RequestContext, RequestHandler};
pub use router::handle_request;
