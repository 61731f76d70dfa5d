//! Notegraph Watcher: filesystem change detection and subscriber fan-out

pub mod bus;
pub mod debounce;
pub mod watcher;

pub use bus::{
    CONNECTED_FRAME, ChangeEvent, ChangeKind, KEEPALIVE_FRAME, KEEPALIVE_INTERVAL, NotificationBus,
    SUBSCRIBER_CAPACITY, Subscription,
};
pub use debounce::{DEBOUNCE_WINDOW, Debouncer};
pub use watcher::{FileWatcher, WatchEvent, WatcherService};
