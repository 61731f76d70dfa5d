//! Axum router setup

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    ServerState,
    auth::require_auth,
    events::event_stream,
    handlers::{
        get_note_raw, graph_data, health_check, index, local_graph, note_page, recent, save_note,
        search_page, tags, toggle_checkbox,
    },
};

/// Create the router. Every route sits behind the authenticator.
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/search", get(search_page))
        // JSON API
        .route("/api/graph-data", get(graph_data))
        .route("/api/local-graph", get(local_graph))
        .route("/api/get-note-raw", get(get_note_raw))
        .route("/api/save-note", post(save_note))
        .route("/api/toggle-checkbox", post(toggle_checkbox))
        .route("/api/tags", get(tags))
        .route("/api/recent", get(recent))
        .route("/api/health", get(health_check))
        // Live reload
        .route("/api/events", get(event_stream))
        // Notes
        .route("/*path", get(note_page))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), require_auth))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
