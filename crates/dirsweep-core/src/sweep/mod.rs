/// Sweep engine — one full, stateful traversal of the watched tree.
///
/// A [`Watcher`] owns the directory cache from the previous sweep. Each call
/// to [`Watcher::sweep`] lists the tree again, diffs it against that cache,
/// publishes `Added`/`Removed` events and updates the cache in place.
///
/// Child directories are swept concurrently on a rayon pool owned by the
/// watcher, so the pool size caps how many directories are listed at once
/// no matter how wide the tree is.
pub mod cancel;
pub mod report;
mod visit;

pub use cancel::CancelToken;
pub use report::SweepReport;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::fs::{FileSystem, OsFileSystem};
use crate::model::{DirCache, EventMask};
use crate::path;
use crate::sink::EventSink;
use report::SweepStats;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use visit::{visit, SweepContext};

/// Default maximum recursion depth.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

/// Default minimum file age before a new file is reported.
pub const DEFAULT_WRITE_STABILITY_THRESHOLD: Duration = Duration::from_secs(15);

/// Plain-data sweep options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Which event kinds are published.
    pub event_mask: EventMask,
    /// Directories at this depth (root = 0) are not listed.
    pub max_depth: u32,
    /// New files younger than this are deferred to a later sweep.
    pub write_stability_threshold: Duration,
    /// Path, relative to the file system root, to treat as the watch root.
    pub sub_root: Option<String>,
    /// Worker threads for directory fan-out. 0 means one per CPU.
    pub parallelism: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            event_mask: EventMask::ALL,
            max_depth: DEFAULT_MAX_DEPTH,
            write_stability_threshold: DEFAULT_WRITE_STABILITY_THRESHOLD,
            sub_root: None,
            parallelism: 0,
        }
    }
}

/// Builder for [`Watcher`].
#[derive(Default)]
pub struct WatcherBuilder {
    config: SweepConfig,
    fs: Option<Arc<dyn FileSystem>>,
    file_filter: Option<Arc<dyn Filter>>,
    dir_filter: Option<Arc<dyn Filter>>,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all plain-data options at once.
    pub fn config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    /// File-system backend. Defaults to the OS file system rooted at the
    /// current directory.
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Some(Arc::new(fs));
        self
    }

    pub fn events(mut self, mask: EventMask) -> Self {
        self.config.event_mask = mask;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn write_stability_threshold(mut self, threshold: Duration) -> Self {
        self.config.write_stability_threshold = threshold;
        self
    }

    pub fn sub_root(mut self, sub_root: impl Into<String>) -> Self {
        self.config.sub_root = Some(sub_root.into());
        self
    }

    pub fn parallelism(mut self, threads: usize) -> Self {
        self.config.parallelism = threads;
        self
    }

    pub fn file_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.file_filter = Some(Arc::new(filter));
        self
    }

    pub fn dir_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.dir_filter = Some(Arc::new(filter));
        self
    }

    pub fn build(self) -> Result<Watcher> {
        let fs: Arc<dyn FileSystem> = match self.fs {
            Some(fs) => fs,
            None => Arc::new(OsFileSystem::current_dir().map_err(|source| Error::Stat {
                path: String::new(),
                source,
            })?),
        };

        let mut config = self.config;
        config.sub_root = config
            .sub_root
            .map(|s| path::normalize(&s))
            .filter(|s| !s.is_empty());

        let threads = match config.parallelism {
            0 => num_cpus::get(),
            n => n,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("dirsweep-worker-{i}"))
            .build()?;

        Ok(Watcher {
            fs,
            config,
            file_filter: self.file_filter,
            dir_filter: self.dir_filter,
            pool,
            cache: DirCache::new(),
        })
    }
}

/// Stateful polling watcher over one file system.
///
/// The cache lives only in memory: a fresh watcher reports every existing,
/// stable, filter-passing file as `Added` on its first sweep.
pub struct Watcher {
    fs: Arc<dyn FileSystem>,
    config: SweepConfig,
    file_filter: Option<Arc<dyn Filter>>,
    dir_filter: Option<Arc<dyn Filter>>,
    pool: rayon::ThreadPool,
    cache: DirCache,
}

impl Watcher {
    pub fn builder() -> WatcherBuilder {
        WatcherBuilder::new()
    }

    /// Watcher over `fs` with default options.
    pub fn new(fs: impl FileSystem + 'static) -> Result<Self> {
        WatcherBuilder::new().file_system(fs).build()
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Number of files currently held in the cache.
    pub fn cached_file_count(&self) -> usize {
        self.cache.file_count()
    }

    /// Perform one full sweep, publishing every change to `sink`.
    ///
    /// Returns `Error::Cancelled` promptly once `cancel` fires. Any other
    /// error aborts the failing branch and its siblings; directories that
    /// had already finished keep their updated cache.
    pub fn sweep(&mut self, cancel: &CancelToken, sink: &dyn EventSink) -> Result<SweepReport> {
        let start = Instant::now();
        info!("sweep started");

        let stats = SweepStats::default();
        let result = self.sweep_inner(cancel, sink, &stats);
        let report = stats.snapshot(start.elapsed());

        match &result {
            Ok(()) => info!(
                "sweep took {:?}, completed successfully ({} added, {} removed, {} dirs)",
                report.duration, report.added, report.removed, report.dirs_visited
            ),
            Err(Error::Cancelled) => info!("sweep took {:?}, cancelled", report.duration),
            Err(err) => warn!("sweep took {:?}, returned error: {err}", report.duration),
        }
        result.map(|()| report)
    }

    fn sweep_inner(
        &mut self,
        cancel: &CancelToken,
        sink: &dyn EventSink,
        stats: &SweepStats,
    ) -> Result<()> {
        cancel.check()?;
        let root = self.resolve_root()?;

        let ctx = SweepContext {
            fs: &*self.fs,
            config: &self.config,
            file_filter: self.file_filter.as_deref(),
            dir_filter: self.dir_filter.as_deref(),
            sink,
            stats,
        };
        let cache = &mut self.cache;
        self.pool.install(|| visit(&ctx, cancel, &root, 0, cache))
    }

    /// The directory the traversal starts from: the sub-root if configured
    /// (which must exist as a directory), otherwise the file system root.
    fn resolve_root(&self) -> Result<String> {
        let Some(sub_root) = &self.config.sub_root else {
            return Ok(String::new());
        };
        match self.fs.stat(sub_root) {
            Ok(entry) if entry.is_dir => Ok(sub_root.clone()),
            Ok(_) => Err(Error::RootNotDirectory {
                path: sub_root.clone(),
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::RootNotFound {
                path: sub_root.clone(),
            }),
            Err(source) => Err(Error::Stat {
                path: sub_root.clone(),
                source,
            }),
        }
    }
}
