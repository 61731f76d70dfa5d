//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use notegraph_core::{NoteStore, NotesConfig};
use notegraph_server::{NoteServer, ServerConfig, ServerState};
use notegraph_watcher::{NotificationBus, WatcherService};

/// `~/notes`, the notes directory used when none is configured.
pub fn default_notes_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory; set NOTES_DIR")?;
    Ok(home.join("notes"))
}

pub async fn serve(notes: NotesConfig, config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!("Notes directory: {}", notes.notes_dir.display());
    if notes.allow_all_paths {
        tracing::warn!("ALLOW_ALL_PATHS is set: notes outside the notes directory can be read and written");
    }
    if !config.is_loopback() {
        tracing::warn!("Binding to {}: the server is reachable from other machines", config.host);
    }
    if !notes.graph_exclude.is_empty() {
        tracing::info!("Excluding from graph: {}", notes.graph_exclude.join(", "));
    }

    let store = NoteStore::open(notes).context("cannot open notes directory")?;
    let root = store.root().to_path_buf();
    let bus = Arc::new(NotificationBus::new());

    // Start file watcher in background task
    let watcher = WatcherService::new(&root, Arc::clone(&bus))?;
    tokio::spawn(async move {
        if let Err(e) = watcher.run().await {
            tracing::error!("File watcher error: {:#}", e);
        }
    });

    let server = NoteServer::new(ServerState::new(store, bus), config.clone());
    tracing::info!("Starting server on http://{}", config.address());
    server.start().await
}
