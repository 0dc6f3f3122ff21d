// Application state module
// Configuration plus the request handler, shared by every connection

use crate::handler::RequestHandler;

use super::types::Config;

/// Application state
///
/// Read-only after startup; requests share nothing mutable through it.
pub struct AppState {
    pub config: Config,
    pub handler: RequestHandler,
}

impl AppState {
    pub const fn new(config: Config, handler: RequestHandler) -> Self {
        Self { config, handler }
    }

    /// Whether `path` falls under the registered URL prefix
    ///
    /// Matching is on whole segments: `/file` covers `/file`, `/file/` and `/file/x`,
    /// but not `/filex`.
    pub fn matches_prefix(&self, path: &str) -> bool {
        let prefix = self.config.http.url_prefix.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}
