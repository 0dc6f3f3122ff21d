//! File validation identity
//!
//! Computes the `ETag` and `Last-Modified` values of a filesystem entry at request time.

use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};

use crate::handler::fs::FileSystem;

/// RFC 1123 layout used for `Last-Modified`, always in GMT
const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Error returned when an `If-Modified-Since` value is not an RFC 1123 date
#[derive(Debug, thiserror::Error)]
#[error("invalid HTTP date '{value}': {source}")]
pub struct InvalidDateFormat {
    pub value: String,
    #[source]
    pub source: chrono::ParseError,
}

/// Cache-validation state of one file, captured from a single stat call
///
/// Equality compares name, absolute path and modification time only. The size is carried
/// along for `Content-Length` but is not part of the identity.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    name: String,
    absolute_path: PathBuf,
    last_modified_millis: i64,
    size: u64,
}

impl FileIdentity {
    pub fn new(
        name: impl Into<String>,
        absolute_path: impl Into<PathBuf>,
        last_modified_millis: i64,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            absolute_path: absolute_path.into(),
            last_modified_millis,
            size,
        }
    }

    /// Stat `path` through `fs` and capture its identity
    ///
    /// Fails with the stat error if the path does not exist or cannot be inspected, and with
    /// [`io::ErrorKind::InvalidInput`] if it names a directory.
    pub fn compute<F: FileSystem + ?Sized>(fs: &F, path: &Path) -> io::Result<Self> {
        let stat = fs.metadata(path)?;
        if stat.is_dir {
            return Err(io::ErrorKind::InvalidInput.into());
        }
        let absolute_path = fs.canonicalize(path)?;
        let name = absolute_path
            .file_name()
            .or_else(|| path.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, absolute_path, stat.modified_millis, stat.len))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub const fn last_modified_millis(&self) -> i64 {
        self.last_modified_millis
    }

    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Quoted `ETag` derived from name, then absolute path, then modification time
    ///
    /// `DefaultHasher` is only stable within one build of the standard library, so tags may
    /// change after a toolchain upgrade. Clients then revalidate once and get a full response.
    pub fn etag(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        self.absolute_path.hash(&mut hasher);
        self.last_modified_millis.hash(&mut hasher);
        format!("\"{:016x}\"", hasher.finish())
    }

    /// Modification time formatted as an RFC 1123 date in GMT
    pub fn last_modified_header_value(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.last_modified_millis)
            .unwrap_or_default()
            .format(RFC1123_FORMAT)
            .to_string()
    }

    /// Returns true if the file was modified strictly after the given RFC 1123 date
    ///
    /// The date is read as GMT: a numeric zone such as `+0200` is accepted but its offset is
    /// discarded. The comparison is done in milliseconds, so a file whose modification time
    /// has a sub-second part counts as newer than its own `Last-Modified` value.
    pub fn is_newer_than(&self, value: &str) -> Result<bool, InvalidDateFormat> {
        let since = DateTime::parse_from_rfc2822(value.trim()).map_err(|source| {
            InvalidDateFormat {
                value: value.to_string(),
                source,
            }
        })?;
        let since_gmt = since.naive_local().and_utc();
        Ok(self.last_modified_millis > since_gmt.timestamp_millis())
    }
}

impl PartialEq for FileIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.last_modified_millis == other.last_modified_millis
            && self.name == other.name
            && self.absolute_path == other.absolute_path
    }
}

impl Eq for FileIdentity {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::fs::LocalFs;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};

    // 2015-05-15 15:34:21 UTC
    const MODIFIED: i64 = 1_431_704_061_000;

    fn identity(name: &str, path: &str, modified: i64) -> FileIdentity {
        FileIdentity::new(name, path, modified, 10)
    }

    #[test]
    fn test_etag_is_deterministic() {
        let a = identity("report.pdf", "/srv/report.pdf", MODIFIED);
        let b = identity("report.pdf", "/srv/report.pdf", MODIFIED);
        assert_eq!(a, b);
        assert_eq!(a.etag(), b.etag());
        assert!(a.etag().starts_with('"'));
        assert!(a.etag().ends_with('"'));
    }

    #[test]
    fn test_etag_changes_with_each_field() {
        let base = identity("report.pdf", "/srv/report.pdf", MODIFIED);
        let renamed = identity("other.pdf", "/srv/report.pdf", MODIFIED);
        let moved = identity("report.pdf", "/tmp/report.pdf", MODIFIED);
        let touched = identity("report.pdf", "/srv/report.pdf", MODIFIED + 1);

        assert_ne!(base.etag(), renamed.etag());
        assert_ne!(base.etag(), moved.etag());
        assert_ne!(base.etag(), touched.etag());
        assert_ne!(base, touched);
    }

    #[test]
    fn test_etag_ignores_size() {
        let small = FileIdentity::new("a", "/a", MODIFIED, 1);
        let large = FileIdentity::new("a", "/a", MODIFIED, 1000);
        assert_eq!(small, large);
        assert_eq!(small.etag(), large.etag());
    }

    #[test]
    fn test_etag_is_order_sensitive() {
        let a = identity("ab", "/x/c", MODIFIED);
        let b = identity("a", "/x/bc", MODIFIED);
        assert_ne!(a.etag(), b.etag());
    }

    #[test]
    fn test_last_modified_header_value() {
        let id = identity("a", "/a", MODIFIED + 250);
        assert_eq!(id.last_modified_header_value(), "Fri, 15 May 2015 15:34:21 GMT");
    }

    #[test]
    fn test_is_newer_than() {
        let id = identity("a", "/a", MODIFIED);
        assert!(id.is_newer_than("Fri, 15 May 2015 15:34:20 GMT").unwrap());
        assert!(!id.is_newer_than("Fri, 15 May 2015 15:34:21 GMT").unwrap());
        assert!(!id.is_newer_than("Sat, 16 May 2015 00:00:00 GMT").unwrap());
    }

    #[test]
    fn test_is_newer_than_compares_milliseconds() {
        let id = identity("a", "/a", MODIFIED + 500);
        let own_header = id.last_modified_header_value();
        assert!(id.is_newer_than(&own_header).unwrap());
    }

    #[test]
    fn test_is_newer_than_reads_zone_as_gmt() {
        let id = identity("a", "/a", MODIFIED);
        assert!(!id.is_newer_than("Fri, 15 May 2015 15:34:21 +0200").unwrap());
        assert!(id.is_newer_than("Fri, 15 May 2015 15:34:20 -0500").unwrap());
    }

    #[test]
    fn test_is_newer_than_rejects_garbage() {
        let id = identity("a", "/a", MODIFIED);
        let err = id.is_newer_than("yesterday").unwrap_err();
        assert_eq!(err.value, "yesterday");
    }

    #[test]
    fn test_compute_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, b"0123456789").unwrap();
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();

        let id = FileIdentity::compute(&LocalFs, &path).unwrap();
        assert_eq!(id.name(), "data.bin");
        assert_eq!(id.size(), 10);
        assert_eq!(id.last_modified_millis(), 1_700_000_000_123);
        assert!(id.absolute_path().is_absolute());

        let again = FileIdentity::compute(&LocalFs, &path).unwrap();
        assert_eq!(id.etag(), again.etag());
    }

    #[test]
    fn test_compute_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileIdentity::compute(&LocalFs, &dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_compute_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileIdentity::compute(&LocalFs, dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
