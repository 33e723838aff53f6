/// The per-directory diff algorithm.
///
/// For each visited directory:
///
/// 1. Directory filter: a rejected directory is left completely alone,
///    including its cache node.
/// 2. Depth ceiling: stop descending, not an error.
/// 3. List entries; a listing error aborts this branch.
/// 4. File filter, then the write-stability gate for files not yet cached.
/// 5. Emit `Added` for new files, then `Removed` for vanished ones
///    (cascading through the cached subtree of a vanished directory).
/// 6. Commit the new entry set, prune/create child nodes.
/// 7. Fan out into every child directory on the rayon pool.
///
/// Cache mutation happens only in step 6, after every event for this
/// directory has been published. A task that is cancelled mid-way leaves its
/// node exactly as the previous sweep left it.
use super::cancel::CancelToken;
use super::report::SweepStats;
use super::SweepConfig;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::fs::FileSystem;
use crate::model::{DirCache, Event, EventKind, FileEntry};
use crate::path;
use crate::sink::EventSink;
use compact_str::CompactString;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tracing::{debug, info};

/// Everything a visit needs besides its own cache node. Shared by reference
/// across all worker threads of one sweep.
pub(super) struct SweepContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub config: &'a SweepConfig,
    pub file_filter: Option<&'a dyn Filter>,
    pub dir_filter: Option<&'a dyn Filter>,
    pub sink: &'a dyn EventSink,
    pub stats: &'a SweepStats,
}

impl SweepContext<'_> {
    fn publish(&self, kind: EventKind, path: String, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        if !self.config.event_mask.contains(kind) {
            return Ok(());
        }
        self.sink.publish(Event { kind, path }, cancel)?;
        let counter = match kind {
            EventKind::Added => &self.stats.added,
            EventKind::Removed => &self.stats.removed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn keep(filter: Option<&dyn Filter>, path: &str) -> Result<bool> {
        match filter {
            None => Ok(true),
            Some(f) => f.filter(path).map_err(|source| Error::Filter {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

pub(super) fn visit(
    ctx: &SweepContext<'_>,
    cancel: &CancelToken,
    dir: &str,
    depth: u32,
    cache: &mut DirCache,
) -> Result<()> {
    cancel.check()?;

    if !SweepContext::keep(ctx.dir_filter, dir)? {
        debug!("directory {dir:?} excluded by filter");
        return Ok(());
    }

    if depth >= ctx.config.max_depth {
        info!("hit max depth {depth} at {dir:?}");
        return Ok(());
    }

    let listing = ctx.fs.read_dir(dir).map_err(|source| Error::ReadDir {
        path: dir.to_owned(),
        source,
    })?;
    ctx.stats.dirs_visited.fetch_add(1, Ordering::Relaxed);
    cancel.check()?;

    let current = select_entries(ctx, dir, listing, cache)?;

    // Added: files with no same-kind counterpart in the cache.
    for entry in current.iter().filter(|e| !e.is_dir) {
        let known = cache.entry(&entry.name).is_some_and(|prev| !prev.is_dir);
        if !known {
            ctx.publish(EventKind::Added, path::join(dir, &entry.name), cancel)?;
        }
    }

    // Removed: cached names that vanished or changed kind.
    let kinds: HashMap<&str, bool> = current
        .iter()
        .map(|e| (e.name.as_str(), e.is_dir))
        .collect();
    let mut gone: Vec<&FileEntry> = cache
        .entries
        .values()
        .filter(|prev| kinds.get(prev.name.as_str()) != Some(&prev.is_dir))
        .collect();
    gone.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    for prev in gone {
        let prev_path = path::join(dir, &prev.name);
        if !prev.is_dir {
            ctx.publish(EventKind::Removed, prev_path, cancel)?;
        } else if let Some(subtree) = cache.child(&prev.name) {
            for file in subtree.cached_files(&prev_path) {
                ctx.publish(EventKind::Removed, file, cancel)?;
            }
        }
    }
    drop(kinds);

    // Commit. Child nodes for vanished directories go with their subtree.
    let subdirs: HashSet<CompactString> = current
        .iter()
        .filter(|e| e.is_dir)
        .map(|e| e.name.clone())
        .collect();
    cache.replace_entries(current);
    cache.retain_children(|name| subdirs.contains(name));
    for name in &subdirs {
        cache.child_mut_or_insert(name);
    }

    fan_out(ctx, cancel, dir, depth, cache)
}

/// Apply the file filter and the stability gate to a raw listing, sorted
/// by name.
fn select_entries(
    ctx: &SweepContext<'_>,
    dir: &str,
    listing: Vec<FileEntry>,
    cache: &DirCache,
) -> Result<Vec<FileEntry>> {
    let threshold = ctx.config.write_stability_threshold;
    let now = SystemTime::now();
    let mut current = Vec::with_capacity(listing.len());

    for entry in listing {
        if !entry.is_dir {
            let full = path::join(dir, &entry.name);
            if !SweepContext::keep(ctx.file_filter, &full)? {
                continue;
            }
            // Already-cached files are never re-gated.
            let cached = cache.entry(&entry.name).is_some_and(|prev| !prev.is_dir);
            if !cached && entry.is_unstable(threshold, now) {
                debug!("{full:?} modified within {threshold:?}, deferring");
                continue;
            }
        }
        current.push(entry);
    }

    current.sort_unstable_by(|a, b| a.name.cmp(&b.name));
    Ok(current)
}

/// Sweep every child directory concurrently.
///
/// Tasks at one level share a child token. The first task to fail records
/// its error and cancels that token so its siblings stop early; the
/// recorded error wins over the `Cancelled` results it provoked.
fn fan_out(
    ctx: &SweepContext<'_>,
    cancel: &CancelToken,
    dir: &str,
    depth: u32,
    cache: &mut DirCache,
) -> Result<()> {
    if cache.children.is_empty() {
        return Ok(());
    }

    let level = cancel.child();
    let first_error: Mutex<Option<Error>> = Mutex::new(None);
    let saw_cancel = AtomicBool::new(false);

    cache.children.par_iter_mut().for_each(|(name, child)| {
        let child_path = path::join(dir, name);
        match visit(ctx, &level, &child_path, depth + 1, child) {
            Ok(()) => {}
            Err(Error::Cancelled) => saw_cancel.store(true, Ordering::Relaxed),
            Err(err) => {
                let mut slot = first_error.lock();
                if slot.is_none() {
                    debug!("aborting siblings under {dir:?}: {err}");
                    *slot = Some(err);
                    level.cancel();
                }
            }
        }
    });

    if let Some(err) = first_error.into_inner() {
        return Err(err);
    }
    if saw_cancel.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
    }
    Ok(())
}
