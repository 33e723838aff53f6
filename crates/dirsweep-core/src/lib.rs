/// dirsweep core — stateful polling directory watcher.
///
/// Detects file additions and removals by sweeping a directory tree and
/// diffing it against an in-memory cache of the previous sweep. Useful where
/// OS change notifications are missing or unreliable (network mounts, FUSE,
/// container volumes).
///
/// This crate has zero CLI dependencies and never installs a logger; it
/// emits `tracing` events and leaves the subscriber to the application.
///
/// # Modules
///
/// - [`sweep`] — The watcher, its builder/config, and the diff algorithm.
/// - [`model`] — Entries, events, and the directory cache tree.
/// - [`fs`] — File-system port plus OS and in-memory backends.
/// - [`filter`] — Per-file and per-directory path filters.
/// - [`sink`] — Where events are published.
/// - [`poll`] — Periodic polling loop and background handle.
pub mod error;
pub mod filter;
pub mod fs;
pub mod model;
pub mod path;
pub mod poll;
pub mod sink;
pub mod sweep;

pub use error::{BoxError, Error, Result};
pub use filter::{AllOf, ExcludePaths, Filter, HiddenFilter};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use model::{Event, EventKind, EventMask, FileEntry};
pub use poll::{start_watch, watch, WatchHandle, EVENT_CHANNEL_CAPACITY};
pub use sink::{CallbackSink, CollectingSink, EventSink};
pub use sweep::{CancelToken, SweepConfig, SweepReport, Watcher, WatcherBuilder};
