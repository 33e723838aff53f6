/// A single directory entry as reported by a [`FileSystem`] listing.
///
/// Entries are produced fresh on every listing and never mutated afterwards.
/// The cache stores them by value, so the previous sweep's view of a file is
/// exactly what was listed back then.
///
/// [`FileSystem`]: crate::fs::FileSystem
use compact_str::CompactString;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name only (NOT the full path).
    pub name: CompactString,
    pub is_dir: bool,
    /// Last modification time as reported by the backend.
    pub modified: SystemTime,
}

impl FileEntry {
    pub fn new_file(name: impl Into<CompactString>, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            modified,
        }
    }

    pub fn new_dir(name: impl Into<CompactString>, modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            modified,
        }
    }

    /// Whether the entry was modified within `threshold` of `now`.
    ///
    /// A modification time in the future counts as unstable: the writer's
    /// clock is ahead of ours and the file may still be growing.
    pub fn is_unstable(&self, threshold: Duration, now: SystemTime) -> bool {
        if threshold.is_zero() {
            return false;
        }
        match now.duration_since(self.modified) {
            Ok(age) => age < threshold,
            Err(_) => true,
        }
    }
}
