/// Retained view of the watched tree from the previous sweep.
///
/// One `DirCache` per visited directory, owned by its parent through the
/// `children` map. The tree is strict: no back-references, no sharing. A node
/// is created lazily the first time its directory is about to be visited and
/// dropped, subtree and all, as soon as the directory disappears.
///
/// Because ownership is a plain tree, a sweep can hand out disjoint
/// `&mut DirCache` borrows to concurrent tasks without any locking.
use super::entry::FileEntry;
use crate::path;
use compact_str::CompactString;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DirCache {
    /// Entries observed in this directory on the last successful visit.
    pub entries: HashMap<CompactString, FileEntry>,
    /// Cache nodes for subdirectories, keyed by directory name.
    pub children: HashMap<CompactString, DirCache>,
}

impl DirCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.entries.get(name)
    }

    pub fn child(&self, name: &str) -> Option<&DirCache> {
        self.children.get(name)
    }

    /// Return the child node for `name`, creating an empty one if absent.
    pub fn child_mut_or_insert(&mut self, name: &str) -> &mut DirCache {
        self.children.entry(CompactString::new(name)).or_default()
    }

    /// Detach and return a child subtree.
    pub fn remove_child(&mut self, name: &str) -> Option<DirCache> {
        self.children.remove(name)
    }

    /// Replace this node's entries with the given set.
    pub fn replace_entries(&mut self, entries: impl IntoIterator<Item = FileEntry>) {
        self.entries = entries
            .into_iter()
            .map(|e| (e.name.clone(), e))
            .collect();
    }

    /// Drop every child node for which `keep` returns `false`.
    pub fn retain_children(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.children.retain(|name, _| keep(name));
    }

    /// Every file transitively cached under this node, depth-first in name
    /// order, as paths joined onto `prefix`.
    ///
    /// A directory entry without a child node (never descended into) simply
    /// contributes nothing.
    pub fn cached_files(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_files(prefix, &mut out);
        out
    }

    fn collect_files(&self, prefix: &str, out: &mut Vec<String>) {
        let mut names: Vec<&CompactString> = self.entries.keys().collect();
        names.sort_unstable();
        for name in names {
            let full = path::join(prefix, name);
            if self.entries[name].is_dir {
                if let Some(child) = self.children.get(name) {
                    child.collect_files(&full, out);
                }
            } else {
                out.push(full);
            }
        }
    }

    /// Number of files cached in this subtree.
    pub fn file_count(&self) -> usize {
        let own = self.entries.values().filter(|e| !e.is_dir).count();
        own + self.children.values().map(DirCache::file_count).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.children.is_empty()
    }
}
