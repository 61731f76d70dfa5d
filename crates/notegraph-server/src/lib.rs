//! HTTP server: note pages, JSON API and the live-reload event stream

pub mod auth;
pub mod error;
pub mod events;
pub mod handlers;
pub mod layout;
pub mod router;

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use notegraph_core::NoteStore;
use notegraph_watcher::NotificationBus;
use tokio::net::TcpListener;
use tracing::info;

pub use auth::{Authenticator, Credentials, OpenAccess};
pub use error::ApiError;
pub use layout::{PageRenderer, PlainLayout, Sidebar};
pub use router::create_router;

/// Shared state handed to every handler.
pub struct ServerState {
    pub store: Arc<NoteStore>,
    pub bus: Arc<NotificationBus>,
    pub auth: Arc<dyn Authenticator>,
    pub layout: Arc<dyn PageRenderer>,
}

impl ServerState {
    /// State with open access and the plain page layout.
    pub fn new(store: NoteStore, bus: Arc<NotificationBus>) -> Self {
        ServerState {
            store: Arc::new(store),
            bus,
            auth: Arc::new(OpenAccess),
            layout: Arc::new(PlainLayout),
        }
    }

    pub fn with_authenticator(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_layout(mut self, layout: Arc<dyn PageRenderer>) -> Self {
        self.layout = layout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the server only accepts local connections.
    pub fn is_loopback(&self) -> bool {
        matches!(self.host.as_str(), "127.0.0.1" | "::1" | "localhost")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

pub struct NoteServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl NoteServer {
    pub fn new(state: ServerState, config: ServerConfig) -> Self {
        NoteServer {
            state: Arc::new(state),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the configured address and serve until Ctrl-C.
    pub async fn start(self) -> anyhow::Result<()> {
        let address = self.config.address();
        let listener = TcpListener::bind(&address)
            .await
            .with_context(|| format!("failed to bind {address}"))?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Open event streams are closed as soon as shutdown begins.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?;
        info!("Serving notes on http://{}", local_addr);

        let bus = Arc::clone(&self.state.bus);
        let app = create_router(self.state);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                bus.shutdown();
            })
            .await
            .context("server error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => tracing::error!("Cannot listen for Ctrl-C: {}", e),
    }
}
