/// Per-sweep counters.
///
/// The traversal bumps shared atomics from every worker thread; the caller
/// gets a plain snapshot once the sweep returns.
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Summary of one completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// `Added` events published (masked-out events are not counted).
    pub added: u64,
    /// `Removed` events published.
    pub removed: u64,
    /// Directories listed.
    pub dirs_visited: u64,
    pub duration: Duration,
}

impl SweepReport {
    pub fn is_quiet(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

#[derive(Debug, Default)]
pub(crate) struct SweepStats {
    pub added: AtomicU64,
    pub removed: AtomicU64,
    pub dirs_visited: AtomicU64,
}

impl SweepStats {
    pub fn snapshot(&self, duration: Duration) -> SweepReport {
        SweepReport {
            added: self.added.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            dirs_visited: self.dirs_visited.load(Ordering::Relaxed),
            duration,
        }
    }
}
