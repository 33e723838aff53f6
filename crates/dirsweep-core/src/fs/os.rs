/// Native OS backend built on `std::fs`.
///
/// Symlinks are followed when classifying entries, so a link to a directory
/// is descended into like a directory. Link cycles are bounded only by the
/// watcher's max depth.
use super::FileSystem;
use crate::model::FileEntry;
use crate::path;
use compact_str::CompactString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct OsFileSystem {
    root: PathBuf,
}

impl OsFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Backend rooted at the process's current working directory.
    pub fn current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, rel: &str) -> PathBuf {
        let mut full = self.root.clone();
        for component in rel.split('/').filter(|c| !c.is_empty()) {
            full.push(component);
        }
        full
    }
}

fn to_entry(name: CompactString, meta: &fs::Metadata) -> FileEntry {
    FileEntry {
        name,
        is_dir: meta.is_dir(),
        // Platforms without mtime support report the epoch, which always
        // reads as stable.
        modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
    }
}

impl FileSystem for OsFileSystem {
    fn read_dir(&self, rel: &str) -> io::Result<Vec<FileEntry>> {
        let dir = self.resolve(rel);
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            // Event paths are UTF-8; a lossy rename would point at a path
            // that does not exist.
            let name = match entry.file_name().into_string() {
                Ok(name) => CompactString::from(name),
                Err(raw) => {
                    warn!("skipping non-UTF-8 entry {raw:?} in {dir:?}");
                    continue;
                }
            };
            // Follow links; the entry may also have vanished since listing.
            let meta = match fs::metadata(entry.path()) {
                Ok(m) => m,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!("entry {:?} vanished during listing, skipping", path::join(rel, &name));
                    continue;
                }
                Err(err) => return Err(err),
            };
            out.push(to_entry(name, &meta));
        }
        Ok(out)
    }

    fn stat(&self, rel: &str) -> io::Result<FileEntry> {
        let meta = fs::metadata(self.resolve(rel))?;
        Ok(to_entry(CompactString::new(path::file_name(rel)), &meta))
    }
}
