/// In-memory backend.
///
/// A flat `path -> node` map behind a `RwLock`, so tests (or callers
/// embedding dirsweep) can mutate the tree between sweeps while sharing it
/// with a watcher through an `Arc`. Parent directories are created
/// implicitly when a nested path is inserted.
///
/// Files inserted without an explicit time are stamped with the Unix epoch,
/// which is always older than any stability threshold.
use super::FileSystem;
use crate::model::FileEntry;
use crate::path;
use compact_str::CompactString;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy)]
struct MemNode {
    is_dir: bool,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, MemNode>,
    /// Paths whose listing fails with `PermissionDenied`.
    failures: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: RwLock<State>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree of epoch-stamped files from a list of paths.
    pub fn with_files<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let fs = Self::new();
        for p in paths {
            fs.insert_file(p);
        }
        fs
    }

    pub fn insert_file(&self, path: &str) {
        self.insert_file_at(path, SystemTime::UNIX_EPOCH);
    }

    pub fn insert_file_at(&self, path: &str, modified: SystemTime) {
        self.insert(path, MemNode {
            is_dir: false,
            modified,
        });
    }

    pub fn insert_dir(&self, path: &str) {
        self.insert(path, MemNode {
            is_dir: true,
            modified: SystemTime::UNIX_EPOCH,
        });
    }

    fn insert(&self, raw: &str, node: MemNode) {
        let path = path::normalize(raw);
        if path.is_empty() {
            return;
        }
        let mut state = self.state.write();
        let mut parent = String::new();
        for component in path.split('/').take(path.matches('/').count()) {
            parent = path::join(&parent, component);
            state.nodes.insert(parent.clone(), MemNode {
                is_dir: true,
                modified: SystemTime::UNIX_EPOCH,
            });
        }
        state.nodes.insert(path, node);
    }

    /// Update the modification time of an existing node. Returns `false` if
    /// the path does not exist.
    pub fn set_modified(&self, path: &str, modified: SystemTime) -> bool {
        let path = path::normalize(path);
        match self.state.write().nodes.get_mut(&path) {
            Some(node) => {
                node.modified = modified;
                true
            }
            None => false,
        }
    }

    /// Remove a path and, if it is a directory, everything beneath it.
    pub fn remove(&self, path: &str) {
        let path = path::normalize(path);
        self.state
            .write()
            .nodes
            .retain(|key, _| !path::is_within(key, &path));
    }

    pub fn exists(&self, path: &str) -> bool {
        let path = path::normalize(path);
        path.is_empty() || self.state.read().nodes.contains_key(&path)
    }

    /// Make every subsequent listing of `path` fail.
    pub fn fail_path(&self, path: &str) {
        self.state.write().failures.insert(path::normalize(path));
    }

    pub fn clear_failures(&self) {
        self.state.write().failures.clear();
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, raw: &str) -> io::Result<Vec<FileEntry>> {
        let dir = path::normalize(raw);
        let state = self.state.read();

        if state.failures.contains(&dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("listing {dir:?} denied"),
            ));
        }
        if !dir.is_empty() {
            match state.nodes.get(&dir) {
                Some(node) if node.is_dir => {}
                Some(_) => {
                    return Err(io::Error::other(format!("{dir:?} is not a directory")));
                }
                None => return Err(io::ErrorKind::NotFound.into()),
            }
        }

        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        let entries = state
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, node)| {
                let name = &key[prefix.len()..];
                (!name.contains('/')).then(|| FileEntry {
                    name: CompactString::new(name),
                    is_dir: node.is_dir,
                    modified: node.modified,
                })
            })
            .collect();
        Ok(entries)
    }

    fn stat(&self, raw: &str) -> io::Result<FileEntry> {
        let path = path::normalize(raw);
        if path.is_empty() {
            return Ok(FileEntry::new_dir("", SystemTime::UNIX_EPOCH));
        }
        let state = self.state.read();
        let node = state.nodes.get(&path).ok_or(io::ErrorKind::NotFound)?;
        Ok(FileEntry {
            name: CompactString::new(path::file_name(&path)),
            is_dir: node.is_dir,
            modified: node.modified,
        })
    }
}
