/// Data model for dirsweep.
///
/// Re-exports the directory cache tree and the entry/event types that flow
/// through a sweep.
pub mod dir_cache;
pub mod entry;
pub mod event;

pub use dir_cache::DirCache;
pub use entry::FileEntry;
pub use event::{Event, EventKind, EventMask};
