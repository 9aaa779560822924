//! Store changes republished on a broadcast channel for async consumers.

use crate::store::{Observable, Subscription};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Events republished from the store cells for async consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A media file was selected
    MediaChanged {
        name: String,
        mime_type: String,
        size: usize,
    },
    /// The media selection was cleared
    MediaCleared,
    /// A new media URL is current
    MediaUrlChanged {
        url: String,
    },
    /// The current media URL was cleared
    MediaUrlCleared,
    /// A media URL was revoked and no longer resolves
    MediaUrlRevoked {
        url: String,
    },
    /// Raw lyrics changed; `len` is 0 when cleared
    RawLyricsChanged {
        len: usize,
    },
    /// Parsed lyrics changed
    ParsedLyricsChanged {
        present: bool,
    },
    /// The app state was shut down; no further events follow
    Shutdown,
}

/// Broadcast channel carrying [`StoreEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per receiver. A
    /// capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to store events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no receivers is not an error.
    pub fn publish(&self, event: StoreEvent) {
        let _ = self.tx.send(event);
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Republish changes of `cell` as events.
    ///
    /// The value replayed on subscription is skipped; only later changes are
    /// published. `map` returning `None` publishes nothing.
    pub fn bridge<T, O, F>(&self, cell: &O, map: F) -> Subscription
    where
        T: 'static,
        O: Observable<T>,
        F: Fn(&T) -> Option<StoreEvent> + Send + Sync + 'static,
    {
        let bus = self.clone();
        let replayed = AtomicBool::new(false);
        cell.subscribe(move |value: &T| {
            if !replayed.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(event) = map(value) {
                bus.publish(event);
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Writable;

    #[tokio::test]
    async fn test_bridge_skips_replay_and_publishes_changes() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let cell: Writable<Option<String>> = Writable::new(Some("initial".to_string()));

        let _bridge = bus.bridge(&cell, |raw: &Option<String>| {
            Some(StoreEvent::RawLyricsChanged {
                len: raw.as_ref().map_or(0, String::len),
            })
        });
        cell.set(Some("abc".to_string()));
        cell.set(None);

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::RawLyricsChanged { len: 3 });
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::RawLyricsChanged { len: 0 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bridge_map_none_publishes_nothing() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let cell = Writable::new(0);

        let _bridge = bus.bridge(&cell, |n: &i32| {
            (*n > 1).then(|| StoreEvent::ParsedLyricsChanged { present: true })
        });
        cell.set(1);
        cell.set(2);

        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::ParsedLyricsChanged { present: true }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_receivers_is_fine() {
        let bus = EventBus::default();
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(StoreEvent::Shutdown);
    }

    #[tokio::test]
    async fn test_zero_capacity_bus_still_delivers() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();

        bus.publish(StoreEvent::Shutdown);

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Shutdown);
    }

    #[test]
    fn test_dropped_bridge_stops_publishing() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let cell = Writable::new(0);

        let bridge = bus.bridge(&cell, |_: &i32| Some(StoreEvent::MediaCleared));
        drop(bridge);
        cell.set(1);

        assert!(rx.try_recv().is_err());
    }
}
