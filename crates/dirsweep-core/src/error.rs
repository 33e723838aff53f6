/// Error type shared by every sweep operation.
///
/// Callers (usually the polling loop) branch on the variant to decide what
/// to do next: `Cancelled` is terminal for the current invocation,
/// `RootNotFound` is expected to clear up on its own, and the I/O and filter
/// variants are retried on the next sweep cycle.
use std::io;
use thiserror::Error;

/// Boxed error returned by user-supplied filters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The sweep observed a cancelled token and stopped.
    #[error("sweep cancelled")]
    Cancelled,

    /// The configured sub-root does not exist (yet).
    #[error("watch root {path:?} not found")]
    RootNotFound { path: String },

    /// The configured sub-root exists but is a file.
    #[error("watch root {path:?} is not a directory")]
    RootNotDirectory { path: String },

    #[error("read dir {path:?}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("stat {path:?}: {source}")]
    Stat {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("filter {path:?}: {source}")]
    Filter {
        path: String,
        #[source]
        source: BoxError,
    },

    /// The receiving side of the event sink went away.
    #[error("event sink closed")]
    SinkClosed,

    #[error("failed to build sweep thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn watch thread: {0}")]
    Spawn(#[source] io::Error),

    /// The background watch thread panicked.
    #[error("watch thread panicked")]
    WatchPanicked,
}

impl Error {
    /// `true` if the sweep stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// `true` if the sub-root was missing at sweep start.
    pub fn is_root_not_found(&self) -> bool {
        matches!(self, Error::RootNotFound { .. })
    }

    /// Whether a later sweep may succeed where this one failed.
    ///
    /// Cancellation and construction failures are never retried; a closed
    /// sink will not reopen either.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::Cancelled
                | Error::SinkClosed
                | Error::ThreadPool(_)
                | Error::Spawn(_)
                | Error::WatchPanicked
        )
    }
}
