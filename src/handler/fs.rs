//! Filesystem access used by the request handler
//!
//! The handler only touches the filesystem through [`FileSystem`], so tests can swap in an
//! in-memory implementation.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of a stat call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    /// Modification time in milliseconds since the Unix epoch (negative before 1970)
    pub modified_millis: i64,
    pub is_dir: bool,
}

/// Read-only filesystem capability
pub trait FileSystem: Send + Sync {
    fn metadata(&self, path: &Path) -> io::Result<FileStat>;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Names of the immediate entries of a directory, in the order the listing reports them
    ///
    /// Fails with [`io::ErrorKind::InvalidInput`] if `path` exists but is not a directory.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
}

/// [`FileSystem`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let meta = fs::metadata(path)?;
        Ok(FileStat {
            len: meta.len(),
            modified_millis: meta.modified().map(system_time_millis)?,
            is_dir: meta.is_dir(),
        })
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        if !fs::metadata(path)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", path.display()),
            ));
        }

        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(path)?))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn system_time_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_millis() as i64,
        Err(before) => -(before.duration().as_millis() as i64),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_list_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("nested.txt"), b"n").unwrap();

        let mut names = LocalFs.list_dir(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.txt".to_string(), "sub".to_string()]);
    }

    #[test]
    fn test_local_list_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();

        let err = LocalFs.list_dir(&file).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = LocalFs.list_dir(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_local_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        let stat = LocalFs.metadata(&file).unwrap();
        assert_eq!(stat.len, 5);
        assert!(!stat.is_dir);
        assert!(stat.modified_millis > 0);
        assert!(LocalFs.metadata(dir.path()).unwrap().is_dir);
    }

    #[test]
    fn test_system_time_millis() {
        let after = UNIX_EPOCH + std::time::Duration::from_millis(1500);
        let before = UNIX_EPOCH - std::time::Duration::from_millis(1500);
        assert_eq!(system_time_millis(after), 1500);
        assert_eq!(system_time_millis(before), -1500);
    }
}
