/// Periodic polling — repeatedly sweep a watcher, sleeping between sweeps.
///
/// # Usage
///
/// ```ignore
/// let handle = start_watch(watcher, Duration::from_secs(5), EVENT_CHANNEL_CAPACITY)?;
/// for event in handle.events_rx.iter() {
///     println!("{event}");
/// }
/// ```
///
/// # Errors between sweeps
///
/// A failed sweep whose error is retryable (I/O, filter, missing sub-root) is
/// logged and the loop carries on with the next cycle. Cancellation and
/// non-retryable errors end the loop.
use crate::error::{Error, Result};
use crate::model::Event;
use crate::sink::EventSink;
use crate::sweep::{CancelToken, Watcher};
use crossbeam_channel::{bounded, Receiver};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Events that may queue up between the background watcher and its consumer
/// before the sweep blocks on publishing.
pub const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// Sweep `watcher` every `interval` until `cancel` fires.
///
/// Only returns on cancellation (`Err(Error::Cancelled)`) or a
/// non-retryable error.
pub fn watch(
    watcher: &mut Watcher,
    interval: Duration,
    cancel: &CancelToken,
    sink: &dyn EventSink,
) -> Result<()> {
    loop {
        match watcher.sweep(cancel, sink) {
            Ok(report) => debug!(
                "sweep finished: {} added, {} removed",
                report.added, report.removed
            ),
            Err(err) if err.is_retryable() => {
                if err.is_root_not_found() {
                    debug!("watch root missing, retrying next cycle: {err}");
                } else {
                    warn!("sweep failed, retrying next cycle: {err}");
                }
            }
            Err(err) => return Err(err),
        }
        cancel.sleep(interval)?;
    }
}

/// Handle to a watcher running on a background thread.
pub struct WatchHandle {
    /// Events published by the background sweeps.
    pub events_rx: Receiver<Event>,
    cancel: CancelToken,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl WatchHandle {
    /// Ask the background loop to stop. Non-blocking.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// A clone of the token controlling the background loop.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop the loop and wait for the thread to exit, returning its final
    /// error unless it was the expected cancellation. A panic on the watch
    /// thread surfaces as [`Error::WatchPanicked`].
    pub fn join(mut self) -> Result<()> {
        self.stop();
        match self.thread.take().map(thread::JoinHandle::join) {
            Some(Ok(Err(Error::Cancelled))) | Some(Ok(Ok(()))) | None => Ok(()),
            Some(Ok(Err(err))) => Err(err),
            Some(Err(_)) => {
                warn!("watch thread panicked");
                Err(Error::WatchPanicked)
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start [`watch`] on a named background thread that publishes into a
/// bounded channel of `capacity` events.
pub fn start_watch(mut watcher: Watcher, interval: Duration, capacity: usize) -> Result<WatchHandle> {
    let (tx, rx) = bounded::<Event>(capacity);
    let cancel = CancelToken::new();
    let thread_cancel = cancel.clone();

    let thread = thread::Builder::new()
        .name("dirsweep-watch".into())
        .spawn(move || {
            let result = watch(&mut watcher, interval, &thread_cancel, &tx);
            debug!("watch loop exited: {result:?}");
            result
        })
        .map_err(Error::Spawn)?;

    Ok(WatchHandle {
        events_rx: rx,
        cancel,
        thread: Some(thread),
    })
}
