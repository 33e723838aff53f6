/// Event sinks — where a sweep publishes what it found.
///
/// Sibling directories are swept concurrently, so a sink receives events
/// from several threads at once and must be `Sync`. Within one directory,
/// events arrive in order: additions, then removals, then whatever the
/// subdirectories report.
///
/// A sink may block (a full bounded channel applies backpressure); in that
/// case it must keep checking the token and return `Error::Cancelled` once
/// it is cancelled.
use crate::error::{Error, Result};
use crate::model::{Event, EventKind};
use crate::sweep::CancelToken;
use crossbeam_channel::{SendTimeoutError, Sender};
use parking_lot::Mutex;
use std::time::Duration;

/// How long a blocked channel send waits before re-checking cancellation.
const SEND_SLICE: Duration = Duration::from_millis(50);

pub trait EventSink: Sync {
    fn publish(&self, event: Event, cancel: &CancelToken) -> Result<()>;
}

impl EventSink for Sender<Event> {
    fn publish(&self, mut event: Event, cancel: &CancelToken) -> Result<()> {
        loop {
            cancel.check()?;
            match self.send_timeout(event, SEND_SLICE) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(ev)) => event = ev,
                Err(SendTimeoutError::Disconnected(_)) => return Err(Error::SinkClosed),
            }
        }
    }
}

/// Adapts a plain closure into a sink. The closure must tolerate being
/// called from several threads.
pub struct CallbackSink<F>(pub F);

impl<F> EventSink for CallbackSink<F>
where
    F: Fn(Event) + Sync,
{
    fn publish(&self, event: Event, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        (self.0)(event);
        Ok(())
    }
}

/// Buffers every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the buffered events, in arrival order.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Paths of buffered `Added` events, sorted.
    pub fn added(&self) -> Vec<String> {
        self.paths_of(EventKind::Added)
    }

    /// Paths of buffered `Removed` events, sorted.
    pub fn removed(&self) -> Vec<String> {
        self.paths_of(EventKind::Removed)
    }

    fn paths_of(&self, kind: EventKind) -> Vec<String> {
        let mut paths: Vec<String> = self
            .events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.path.clone())
            .collect();
        paths.sort();
        paths
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: Event, cancel: &CancelToken) -> Result<()> {
        cancel.check()?;
        self.events.lock().push(event);
        Ok(())
    }
}
