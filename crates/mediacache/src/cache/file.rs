//! Contract for the on-disk ranged cache file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name postfix marking a cache file whose download has not completed yet.
pub const TEMP_POSTFIX: &str = ".download";

/// Handle to one append-only ranged cache file.
///
/// The implementation lives outside this crate; the engine relies only on
/// this contract. Handles are shared between tasks, so all operations take
/// `&self`.
pub trait CacheFile: std::fmt::Debug + Send + Sync {
    /// Append a block of bytes at the end of the cached range.
    fn append(&self, data: &[u8]) -> io::Result<()>;

    /// Whether the whole resource has been cached.
    fn is_completed(&self) -> bool;

    /// Number of bytes already cached.
    fn available(&self) -> io::Result<u64>;

    /// Path of the backing file.
    fn file(&self) -> PathBuf;

    /// Flush and close the backing file.
    fn close(&self) -> io::Result<()>;
}

/// Constructs cache-file handles for the registry.
pub trait CacheFileFactory: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Arc<dyn CacheFile>>;
}

/// Path of the in-progress variant of `path`.
pub fn temp_file(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TEMP_POSTFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_file_appends_postfix() {
        let path = Path::new("/cache/abc123.mp4");
        assert_eq!(temp_file(path), PathBuf::from("/cache/abc123.mp4.download"));
    }
}
