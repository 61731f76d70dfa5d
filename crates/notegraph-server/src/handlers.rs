//! Page and JSON API handlers
//!
//! Every store call touches the filesystem, so it runs on the blocking pool.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use notegraph_core::{GraphData, LocalGraphData, NoteStore, RECENT_LIMIT, RecentNote, TagCount};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ApiError, ServerState,
    layout::{Sidebar, not_found_html, search_results_html},
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RawNoteResponse {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveNoteRequest {
    pub note_path: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleCheckboxRequest {
    pub note_path: Option<String>,
    pub checkbox_index: Option<i64>,
    pub checked: Option<bool>,
}

/// Run `f` against the store on the blocking pool.
async fn with_store<T, F>(state: &ServerState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&NoteStore) -> T + Send + 'static,
{
    let store = Arc::clone(&state.store);
    Ok(tokio::task::spawn_blocking(move || f(&store)).await?)
}

/// Note name from a request path: leading `/` dropped, empty rejected.
fn note_name(raw: Option<&str>) -> Option<String> {
    let name = raw?.trim().trim_start_matches('/');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Render the default note.
pub async fn index(State(state): State<Arc<ServerState>>) -> Response {
    let name = state.store.default_note().to_string();
    render_page(&state, name).await
}

/// Render the note named by the request path.
pub async fn note_page(State(state): State<Arc<ServerState>>, Path(path): Path<String>) -> Response {
    let name = note_name(Some(&path)).unwrap_or_else(|| state.store.default_note().to_string());
    render_page(&state, name).await
}

async fn render_page(state: &ServerState, name: String) -> Response {
    let lookup = name.clone();
    let rendered = with_store(state, move |store| {
        let note = store.render(&lookup)?;
        Ok::<_, notegraph_core::NoteError>((note, sidebar(store)))
    })
    .await;

    match rendered {
        Ok(Ok((note, sidebar))) => {
            Html(state.layout.render_page(&note.title, &note.html, &sidebar)).into_response()
        }
        Ok(Err(err)) if err.is_not_found() => {
            debug!("No note {}", name);
            let sidebar = with_store(state, sidebar).await.unwrap_or_default();
            let page = state
                .layout
                .render_page("Note not found", &not_found_html(&name), &sidebar);
            (StatusCode::NOT_FOUND, Html(page)).into_response()
        }
        Ok(Err(err)) => ApiError::from(err).into_response(),
        Err(err) => err.into_response(),
    }
}

fn sidebar(store: &NoteStore) -> Sidebar {
    Sidebar {
        tags: store.tags(),
        recent: store.recent(RECENT_LIMIT),
    }
}

/// Search results page.
pub async fn search_page(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, ApiError> {
    let query = query.q.unwrap_or_default().trim().to_string();
    let needle = query.clone();
    let (hits, sidebar) = with_store(&state, move |store| {
        let hits = if needle.is_empty() {
            Vec::new()
        } else {
            store.search(&needle)
        };
        (hits, sidebar(store))
    })
    .await?;

    let body = search_results_html(&query, &hits);
    Ok(Html(state.layout.render_page(&format!("Search: {query}"), &body, &sidebar)))
}

pub async fn graph_data(State(state): State<Arc<ServerState>>) -> Result<Json<GraphData>, ApiError> {
    let graph = with_store(&state, |store| store.graph()).await?;
    debug!("Serving graph with {} nodes, {} edges", graph.nodes.len(), graph.edges.len());
    Ok(Json(graph))
}

pub async fn local_graph(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<LocalGraphData>, ApiError> {
    let name = note_name(query.path.as_deref())
        .ok_or_else(|| ApiError::bad_request("Missing path parameter"))?;
    let graph = with_store(&state, move |store| store.local_graph(&name)).await??;
    Ok(Json(graph))
}

pub async fn get_note_raw(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<RawNoteResponse>, ApiError> {
    let name = note_name(query.path.as_deref())
        .ok_or_else(|| ApiError::bad_request("Missing path parameter"))?;
    let content = with_store(&state, move |store| store.read_raw(&name)).await??;
    Ok(Json(RawNoteResponse { content }))
}

pub async fn save_note(
    State(state): State<Arc<ServerState>>,
    body: Option<Json<SaveNoteRequest>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let (Some(name), Some(content)) = (note_name(request.note_path.as_deref()), request.content) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    info!("Saving note {}", name);
    with_store(&state, move |store| store.save(&name, &content)).await??;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn toggle_checkbox(
    State(state): State<Arc<ServerState>>,
    body: Option<Json<ToggleCheckboxRequest>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(request) = body.ok_or_else(|| ApiError::bad_request("No JSON data provided"))?;
    let (Some(name), Some(index), Some(checked)) = (
        note_name(request.note_path.as_deref()),
        request.checkbox_index,
        request.checked,
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    debug!("Setting checkbox {} of {} to {}", index, name, checked);
    with_store(&state, move |store| store.toggle_checkbox(&name, index, checked)).await??;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn tags(State(state): State<Arc<ServerState>>) -> Result<Json<Vec<TagCount>>, ApiError> {
    Ok(Json(with_store(&state, |store| store.tags()).await?))
}

pub async fn recent(State(state): State<Arc<ServerState>>) -> Result<Json<Vec<RecentNote>>, ApiError> {
    Ok(Json(with_store(&state, |store| store.recent(RECENT_LIMIT)).await?))
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
