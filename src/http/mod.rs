//! HTTP protocol layer module
//!
//! Cache validation, query parsing and response building, kept apart from the
//! filesystem-facing handler.

pub mod conditional;
pub mod identity;
pub mod mime;
pub mod query;
pub mod response;

pub use response::{build_405_response, build_error_response, build_file_response};
