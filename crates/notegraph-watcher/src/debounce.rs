//! Per-path event debouncing

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Events for a path arriving within this window of its last accepted event
/// are dropped.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Entries idle for this many windows are swept, and sweeps run at most
/// this often.
const EVICTION_WINDOWS: u32 = 20;

/// Remembers when each path last produced an accepted event.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_accepted: HashMap<PathBuf, Instant>,
    last_sweep: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer {
            window,
            last_accepted: HashMap::new(),
            last_sweep: None,
        }
    }

    /// Whether an event for `path` at `now` should go through.
    pub fn accept(&mut self, path: &Path, now: Instant) -> bool {
        self.sweep(now);

        if let Some(&previous) = self.last_accepted.get(path) {
            if now.saturating_duration_since(previous) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(path.to_path_buf(), now);
        true
    }

    /// Number of paths currently remembered.
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }

    fn sweep(&mut self, now: Instant) {
        let horizon = self.window * EVICTION_WINDOWS;
        if self
            .last_sweep
            .is_some_and(|at| now.saturating_duration_since(at) < horizon)
        {
            return;
        }
        self.last_sweep = Some(now);

        let before = self.last_accepted.len();
        self.last_accepted
            .retain(|_, at| now.saturating_duration_since(*at) < horizon);
        let evicted = before - self.last_accepted.len();
        if evicted > 0 {
            debug!("Evicted {} idle debounce entries", evicted);
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}
