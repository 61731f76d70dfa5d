//! In-memory fan-out of change events to event-stream subscribers
//!
//! Delivery is best-effort and at-most-once. A subscriber whose queue is
//! full when a broadcast arrives is dropped from the registry on the spot;
//! nothing is retried or replayed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Frames a subscriber may have queued before it is evicted.
pub const SUBSCRIBER_CAPACITY: usize = 100;

/// Idle time after which a subscription yields [`KEEPALIVE_FRAME`].
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// First frame of every subscription.
pub const CONNECTED_FRAME: &str = "event: connected\ndata: ok\n\n";

/// Comment frame keeping idle connections open.
pub const KEEPALIVE_FRAME: &str = ": keepalive\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A debounced change to one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// URL path of the note (`/` + root-relative path, no extension).
    pub path: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<String>) -> Self {
        ChangeEvent {
            kind,
            path: path.into(),
        }
    }

    /// Serialized event-stream frame.
    pub fn frame(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.kind, self.path)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: HashMap<u64, mpsc::Sender<String>>,
}

/// Registry of live subscriptions.
///
/// One mutex covers registration, removal and broadcast enumeration.
/// Enqueueing never blocks while it is held.
pub struct NotificationBus {
    registry: Mutex<Registry>,
    shutdown: watch::Sender<bool>,
    capacity: usize,
    keepalive: Duration,
}

impl fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .field("capacity", &self.capacity)
            .field("keepalive", &self.keepalive)
            .finish()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        NotificationBus {
            registry: Mutex::new(Registry::default()),
            shutdown,
            capacity: SUBSCRIBER_CAPACITY,
            keepalive: KEEPALIVE_INTERVAL,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Register a new subscriber.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = {
            let mut registry = self.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.subscribers.insert(id, tx);
            id
        };
        debug!("Subscriber {} connected", id);

        Subscription {
            id,
            bus: Arc::clone(self),
            rx,
            shutdown: self.shutdown.subscribe(),
            keepalive: self.keepalive,
            greeted: false,
        }
    }

    /// Queue `event` for every subscriber. Returns how many accepted it.
    pub fn broadcast(&self, event: &ChangeEvent) -> usize {
        self.send_frame(event.frame())
    }

    /// Queue a raw frame for every subscriber, evicting any that cannot take it.
    pub fn send_frame(&self, frame: String) -> usize {
        let mut registry = self.lock();
        let mut delivered = 0;
        registry.subscribers.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Subscriber {} is not keeping up, dropping it", id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Subscriber {} already gone", id);
                false
            }
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// End every open subscription stream.
    pub fn shutdown(&self) {
        info!("Closing {} event subscriptions", self.subscriber_count());
        self.shutdown.send_replace(true);
        self.lock().subscribers.clear();
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that flips to `true` when [`shutdown`](Self::shutdown) is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    fn unsubscribe(&self, id: u64) {
        if self.lock().subscribers.remove(&id).is_some() {
            debug!("Subscriber {} disconnected", id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's end of the bus. Dropping it deregisters the subscriber.
pub struct Subscription {
    id: u64,
    bus: Arc<NotificationBus>,
    rx: mpsc::Receiver<String>,
    shutdown: watch::Receiver<bool>,
    keepalive: Duration,
    greeted: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next frame to write to the client, or `None` once the stream is over.
    ///
    /// The first frame is always [`CONNECTED_FRAME`]. After that, queued
    /// frames in order, with a [`KEEPALIVE_FRAME`] whenever nothing arrives
    /// within the keepalive interval.
    pub async fn next_frame(&mut self) -> Option<String> {
        if !self.greeted {
            self.greeted = true;
            return Some(CONNECTED_FRAME.to_string());
        }
        if *self.shutdown.borrow() {
            return None;
        }

        tokio::select! {
            _ = self.shutdown.changed() => None,
            received = tokio::time::timeout(self.keepalive, self.rx.recv()) => match received {
                Ok(Some(frame)) => Some(frame),
                Ok(None) => None,
                Err(_) => Some(KEEPALIVE_FRAME.to_string()),
            },
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    fn event(path: &str) -> ChangeEvent {
        ChangeEvent::new(ChangeKind::Modified, path)
    }

    #[test]
    fn test_frame_format() {
        assert_eq!(
            ChangeEvent::new(ChangeKind::Deleted, "/projects/todo").frame(),
            "event: deleted\ndata: /projects/todo\n\n"
        );
    }

    #[tokio::test]
    async fn test_first_frame_is_connected() {
        let bus = Arc::new(NotificationBus::new());
        let mut sub = bus.subscribe();
        bus.broadcast(&event("/home"));

        assert_eq!(sub.next_frame().await.as_deref(), Some(CONNECTED_FRAME));
        assert_eq!(
            sub.next_frame().await.as_deref(),
            Some("event: modified\ndata: /home\n\n")
        );
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let bus = Arc::new(NotificationBus::new());
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.broadcast(&event("/todo")), 2);

        for sub in [&mut a, &mut b] {
            sub.next_frame().await;
            assert_eq!(sub.next_frame().await, Some(event("/todo").frame()));
        }
    }

    #[tokio::test]
    async fn test_full_subscriber_is_evicted() {
        let bus = Arc::new(NotificationBus::new());
        let mut slow = bus.subscribe();
        let fast = bus.subscribe();

        for i in 0..SUBSCRIBER_CAPACITY {
            assert_eq!(bus.broadcast(&event(&format!("/n{i}"))), 2);
        }
        assert_eq!(bus.subscriber_count(), 2);

        drop(fast);
        assert_eq!(bus.broadcast(&event("/overflow")), 0);
        assert_eq!(bus.subscriber_count(), 0);

        // buffered frames drain, then the stream ends
        assert_eq!(slow.next_frame().await.as_deref(), Some(CONNECTED_FRAME));
        for i in 0..SUBSCRIBER_CAPACITY {
            assert_eq!(slow.next_frame().await, Some(event(&format!("/n{i}")).frame()));
        }
        assert_eq!(slow.next_frame().await, None);
    }

    #[tokio::test]
    async fn test_capacity_bounds_each_queue() {
        let bus = Arc::new(NotificationBus::new().with_capacity(2));
        let mut slow = bus.subscribe();
        let mut fast = bus.subscribe();

        assert_eq!(bus.broadcast(&event("/a")), 2);
        assert_eq!(fast.next_frame().await.as_deref(), Some(CONNECTED_FRAME));
        assert_eq!(fast.next_frame().await, Some(event("/a").frame()));
        assert_eq!(bus.broadcast(&event("/b")), 2);

        // slow now holds two undrained frames
        assert_eq!(bus.broadcast(&event("/c")), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(fast.next_frame().await, Some(event("/b").frame()));
        assert_eq!(fast.next_frame().await, Some(event("/c").frame()));

        assert_eq!(slow.next_frame().await.as_deref(), Some(CONNECTED_FRAME));
        assert_eq!(slow.next_frame().await, Some(event("/a").frame()));
        assert_eq!(slow.next_frame().await, Some(event("/b").frame()));
        assert_eq!(slow.next_frame().await, None);
    }

    #[tokio::test]
    async fn test_drop_deregisters() {
        let bus = Arc::new(NotificationBus::new());
        let sub = bus.subscribe();
        let other = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub);
        assert_eq!(bus.subscriber_count(), 1);
        drop(other);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.broadcast(&event("/home")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_after_idle_interval() {
        let bus = Arc::new(NotificationBus::new());
        let mut sub = bus.subscribe();
        sub.next_frame().await;

        let started = tokio::time::Instant::now();
        assert_eq!(sub.next_frame().await.as_deref(), Some(KEEPALIVE_FRAME));
        assert!(started.elapsed() >= KEEPALIVE_INTERVAL);
    }

    #[tokio::test]
    async fn test_waits_for_frames() {
        let bus = Arc::new(NotificationBus::new().with_keepalive(Duration::from_secs(3600)));
        let mut sub = bus.subscribe();
        sub.next_frame().await;

        let mut next = task::spawn(sub.next_frame());
        assert_pending!(next.poll());

        bus.broadcast(&event("/later"));
        assert!(next.is_woken());
        assert_ready_eq!(next.poll(), Some(event("/later").frame()));
    }

    #[tokio::test]
    async fn test_shutdown_ends_streams() {
        let bus = Arc::new(NotificationBus::new());
        let mut sub = bus.subscribe();
        sub.next_frame().await;

        let mut next = task::spawn(sub.next_frame());
        assert_pending!(next.poll());

        bus.shutdown();
        assert!(bus.is_shut_down());
        assert_ready_eq!(next.poll(), None);
        drop(next);
        assert_eq!(sub.next_frame().await, None);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
