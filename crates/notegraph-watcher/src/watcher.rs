//! Filesystem watcher feeding the notification bus

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use notegraph_core::{is_document, is_hidden, url_for};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bus::{ChangeEvent, ChangeKind, NotificationBus};
use crate::debounce::Debouncer;

/// A raw filesystem change, before filtering and debouncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Recursive watcher over the notes root
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    root_path: PathBuf,
}

impl FileWatcher {
    /// Create a watcher for `root_path`. Nothing is watched until [`start`](Self::start).
    pub fn new(root_path: impl AsRef<Path>) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for change in translate(event) {
                    if event_tx.send(change).is_err() {
                        debug!("Watch event receiver closed");
                        return;
                    }
                }
            }
            Err(e) => error!("File system watch error: {}", e),
        })
        .context("failed to create filesystem watcher")?;

        Ok(Self {
            watcher,
            event_rx,
            root_path,
        })
    }

    /// Begin watching the root recursively.
    pub fn start(&mut self) -> Result<()> {
        self.watcher
            .watch(&self.root_path, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", self.root_path.display()))?;
        info!("Watching directory: {}", self.root_path.display());
        Ok(())
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Next raw event, or `None` if the watcher has stopped.
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }
}

/// Map a notify event to raw changes. Access and other kinds are dropped.
fn translate(event: notify::Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Deleted,
        _ => return Vec::new(),
    };
    event
        .paths
        .into_iter()
        .map(|path| WatchEvent { kind, path })
        .collect()
}

/// Turns raw watcher output into debounced [`ChangeEvent`]s on the bus.
pub struct WatcherService {
    watcher: FileWatcher,
    bus: Arc<NotificationBus>,
    debouncer: Debouncer,
}

impl WatcherService {
    pub fn new(root_path: impl AsRef<Path>, bus: Arc<NotificationBus>) -> Result<Self> {
        let root_path = root_path.as_ref();
        let root = root_path
            .canonicalize()
            .with_context(|| format!("notes directory {} is not accessible", root_path.display()))?;
        let watcher = FileWatcher::new(&root)?;

        Ok(Self {
            watcher,
            bus,
            debouncer: Debouncer::default(),
        })
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    /// Start watching and process events until the bus shuts down.
    pub async fn run(mut self) -> Result<()> {
        self.watcher.start()?;
        let mut shutdown = self.bus.shutdown_signal();
        if *shutdown.borrow() {
            return Ok(());
        }

        loop {
            let event = tokio::select! {
                _ = shutdown.changed() => break,
                event = self.watcher.next_event() => event,
            };
            let Some(event) = event else {
                warn!("Filesystem watcher stopped");
                break;
            };
            if let Some(change) = self.accept(event, Instant::now()) {
                let delivered = self.bus.broadcast(&change);
                debug!("{} {} sent to {} subscribers", change.kind, change.path, delivered);
            }
        }

        info!("Watcher for {} stopped", self.watcher.root_path().display());
        Ok(())
    }

    /// Filter and debounce one raw event. Deletes are never debounced.
    pub fn accept(&mut self, event: WatchEvent, now: Instant) -> Option<ChangeEvent> {
        if !is_document(&event.path) {
            return None;
        }
        let rel = self.relative(&event.path)?;
        if is_hidden(&rel) {
            return None;
        }
        if event.kind != ChangeKind::Deleted && !self.debouncer.accept(&event.path, now) {
            debug!("Debounced {} of {}", event.kind, event.path.display());
            return None;
        }
        Some(ChangeEvent::new(event.kind, url_for(&rel)))
    }

    /// Root-relative form of `path`, tolerating symlinked roots for files
    /// that still exist or whose parent does.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let root = self.watcher.root_path();
        if let Ok(rel) = path.strip_prefix(root) {
            return Some(rel.to_path_buf());
        }
        let parent = path.parent()?.canonicalize().ok()?;
        let resolved = parent.join(path.file_name()?);
        resolved.strip_prefix(root).ok().map(Path::to_path_buf)
    }
}
