/// File-system port — the sole I/O boundary of the sweep engine.
///
/// The engine only ever lists directories and, when a sub-root is
/// configured, stats that one path. Anything that can answer those two
/// questions can be watched: the local disk, an in-memory tree for tests, or
/// a network-backed implementation.
///
/// Paths are `/`-separated and relative to the backend's own root; `""`
/// denotes the root itself.
pub mod memory;
pub mod os;

pub use memory::MemoryFileSystem;
pub use os::OsFileSystem;

use crate::model::FileEntry;
use std::io;
use std::sync::Arc;

pub trait FileSystem: Send + Sync {
    /// List the entries of the directory at `path`.
    ///
    /// Implementations should skip entries that vanish between the listing
    /// and their metadata lookup rather than failing the whole call.
    fn read_dir(&self, path: &str) -> io::Result<Vec<FileEntry>>;

    /// Metadata for a single path. The returned entry's `name` is the final
    /// path component (empty for the root).
    fn stat(&self, path: &str) -> io::Result<FileEntry>;
}

impl<T: FileSystem + ?Sized> FileSystem for Arc<T> {
    fn read_dir(&self, path: &str) -> io::Result<Vec<FileEntry>> {
        (**self).read_dir(path)
    }

    fn stat(&self, path: &str) -> io::Result<FileEntry> {
        (**self).stat(path)
    }
}
