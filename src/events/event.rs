//! Event types carried by the event channel.

use std::path::PathBuf;

use crate::index::RefreshSummary;

/// Discriminant used to key subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// New files appeared in a watched directory.
    FilesDiscovered,
    /// A refresh batch finished indexing.
    IndexRefreshed,
}

/// Events published on the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Files created in one watcher wake-up, in notification order.
    FilesDiscovered(Vec<PathBuf>),
    /// Every task started by one refresh has completed.
    IndexRefreshed(RefreshSummary),
}

impl Event {
    /// The kind subscribers register for.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::FilesDiscovered(_) => EventKind::FilesDiscovered,
            Self::IndexRefreshed(_) => EventKind::IndexRefreshed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let discovered = Event::FilesDiscovered(vec![PathBuf::from("/docs/a.txt")]);
        assert_eq!(discovered.kind(), EventKind::FilesDiscovered);

        let refreshed = Event::IndexRefreshed(RefreshSummary::default());
        assert_eq!(refreshed.kind(), EventKind::IndexRefreshed);
    }
}
