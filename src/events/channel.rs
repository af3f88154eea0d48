//! Kind-keyed publish/subscribe channel.

use std::sync::Arc;

use dashmap::DashMap;

use super::event::{Event, EventKind};

/// Receives events published on an [`EventChannel`].
///
/// Handlers run synchronously on the publishing thread.
pub trait Subscriber: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &Event);
}

impl<F> Subscriber for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event);
    }
}

/// Identity of a subscriber, ignoring the vtable part of the pointer.
fn same_subscriber(a: &Arc<dyn Subscriber>, b: &Arc<dyn Subscriber>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a).cast::<()>(),
        Arc::as_ptr(b).cast::<()>(),
    )
}

/// Publish/subscribe relay keyed by [`EventKind`].
///
/// Cloning yields another handle to the same subscriptions.
#[derive(Clone, Default)]
pub struct EventChannel {
    subscribers: Arc<DashMap<EventKind, Vec<Arc<dyn Subscriber>>>>,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<(EventKind, usize)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect();
        f.debug_struct("EventChannel")
            .field("subscribers", &counts)
            .finish()
    }
}

impl EventChannel {
    /// Create a channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of `kind`.
    ///
    /// Returns `false` if the subscriber was already registered for it.
    pub fn register(&self, kind: EventKind, subscriber: Arc<dyn Subscriber>) -> bool {
        let mut set = self.subscribers.entry(kind).or_default();
        if set.iter().any(|s| same_subscriber(s, &subscriber)) {
            return false;
        }
        set.push(subscriber);
        tracing::trace!(?kind, subscribers = set.len(), "Subscriber registered");
        true
    }

    /// Remove a subscription.
    ///
    /// Returns `false` if the subscriber was not registered for `kind`.
    pub fn unregister(&self, kind: EventKind, subscriber: &Arc<dyn Subscriber>) -> bool {
        let Some(mut set) = self.subscribers.get_mut(&kind) else {
            return false;
        };
        let before = set.len();
        set.retain(|s| !same_subscriber(s, subscriber));
        let removed = set.len() != before;
        if removed {
            tracing::trace!(?kind, subscribers = set.len(), "Subscriber unregistered");
        }
        removed
    }

    /// Number of subscribers for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map_or(0, |set| set.len())
    }

    /// Deliver `event` to every subscriber of its kind.
    ///
    /// The subscriber set is snapshotted first, so handlers may register or
    /// unregister. Returns the number of subscribers invoked.
    pub fn publish(&self, event: &Event) -> usize {
        let kind = event.kind();
        let receivers: Vec<Arc<dyn Subscriber>> = match self.subscribers.get(&kind) {
            Some(set) => set.value().clone(),
            None => return 0,
        };

        for subscriber in &receivers {
            subscriber.on_event(event);
        }
        receivers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RefreshSummary;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn Subscriber>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscriber: Arc<dyn Subscriber> = Arc::new(move |_: &Event| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, subscriber)
    }

    fn discovered() -> Event {
        Event::FilesDiscovered(vec![PathBuf::from("/docs/a.txt")])
    }

    #[test]
    fn test_publish_without_subscribers() {
        let channel = EventChannel::new();
        assert_eq!(channel.publish(&discovered()), 0);
    }

    #[test]
    fn test_publish_delivers_payload() {
        let channel = EventChannel::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        channel.register(
            EventKind::FilesDiscovered,
            Arc::new(move |event: &Event| sink.lock().push(event.clone())),
        );

        assert_eq!(channel.publish(&discovered()), 1);
        assert_eq!(*received.lock(), vec![discovered()]);
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let channel = EventChannel::new();
        let (count, subscriber) = counter();

        assert!(channel.register(EventKind::FilesDiscovered, Arc::clone(&subscriber)));
        assert!(!channel.register(EventKind::FilesDiscovered, Arc::clone(&subscriber)));
        assert_eq!(channel.subscriber_count(EventKind::FilesDiscovered), 1);

        channel.publish(&discovered());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_by_exact_kind() {
        let channel = EventChannel::new();
        let (files, files_sub) = counter();
        let (refreshes, refresh_sub) = counter();
        channel.register(EventKind::FilesDiscovered, files_sub);
        channel.register(EventKind::IndexRefreshed, refresh_sub);

        channel.publish(&Event::IndexRefreshed(RefreshSummary::default()));
        channel.publish(&Event::IndexRefreshed(RefreshSummary::default()));
        channel.publish(&discovered());

        assert_eq!(files.load(Ordering::SeqCst), 1);
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let channel = EventChannel::new();
        let (count, subscriber) = counter();
        channel.register(EventKind::FilesDiscovered, Arc::clone(&subscriber));

        assert!(channel.unregister(EventKind::FilesDiscovered, &subscriber));
        assert!(!channel.unregister(EventKind::FilesDiscovered, &subscriber));
        assert!(!channel.unregister(EventKind::IndexRefreshed, &subscriber));

        channel.publish(&discovered());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_may_unregister_itself() {
        let channel = EventChannel::new();
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Arc<dyn Subscriber>>>> = Arc::new(Mutex::new(None));

        let handler_channel = channel.clone();
        let handler_slot = Arc::clone(&slot);
        let handler_count = Arc::clone(&count);
        let subscriber: Arc<dyn Subscriber> = Arc::new(move |_: &Event| {
            handler_count.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = handler_slot.lock().take() {
                handler_channel.unregister(EventKind::FilesDiscovered, &me);
            }
        });
        *slot.lock() = Some(Arc::clone(&subscriber));
        channel.register(EventKind::FilesDiscovered, subscriber);

        channel.publish(&discovered());
        channel.publish(&discovered());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_register_and_publish() {
        let channel = EventChannel::new();
        let (count, subscriber) = counter();

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let channel = channel.clone();
                let subscriber = Arc::clone(&subscriber);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        channel.register(EventKind::FilesDiscovered, Arc::clone(&subscriber));
                        channel.publish(&discovered());
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(channel.subscriber_count(EventKind::FilesDiscovered), 1);
        assert_eq!(count.load(Ordering::SeqCst), 400);
    }
}
