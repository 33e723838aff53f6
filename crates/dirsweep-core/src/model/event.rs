/// Add/remove events emitted by a sweep, and the mask that selects them.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// What happened to a file between two sweeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Added,
    Removed,
}

/// A single file event.
///
/// `path` is relative to the base file system and already carries the
/// sub-root prefix when one is configured.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub path: String,
}

impl Event {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Added,
            path: path.into(),
        }
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Removed,
            path: path.into(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Added => write!(f, "[+] {}", self.path),
            EventKind::Removed => write!(f, "[-] {}", self.path),
        }
    }
}

/// Bitmask selecting which event kinds a watcher emits.
///
/// Masked-out events are still *detected* (the cache is updated the same
/// way); they are just never published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMask(u8);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const ADDED: EventMask = EventMask(1 << 0);
    pub const REMOVED: EventMask = EventMask(1 << 1);
    pub const ALL: EventMask = EventMask(0b11);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, kind: EventKind) -> bool {
        let bit = match kind {
            EventKind::Added => Self::ADDED.0,
            EventKind::Removed => Self::REMOVED.0,
        };
        self.0 & bit != 0
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Added => Self::ADDED,
            EventKind::Removed => Self::REMOVED,
        }
    }
}
