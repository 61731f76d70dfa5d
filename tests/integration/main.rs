//! Integration tests for Notegraph
//!
//! These tests run a real server on an ephemeral port and talk to it over HTTP.

use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use notegraph_core::{NoteStore, NotesConfig};
use notegraph_server::{Authenticator, Credentials, NoteServer, ServerConfig, ServerState};
use notegraph_watcher::{NotificationBus, WatcherService};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;

struct TestServer {
    addr: SocketAddr,
    bus: Arc<NotificationBus>,
    stop: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
    notes: TempDir,
}

impl TestServer {
    async fn start(configure: impl FnOnce(ServerState) -> ServerState) -> Self {
        let notes = TempDir::new().unwrap();
        let root = notes.path().join("notes");
        fs::create_dir_all(root.join("projects")).unwrap();
        fs::write(root.join("homepage.md"), "# Home\n\nSee [[todo]] and [[roadmap]].\n").unwrap();
        fs::write(root.join("todo.md"), "- [ ] one\n- [ ] two\n").unwrap();
        fs::write(root.join("projects/roadmap.md"), "Back [[homepage]]. Next [[far]].\n").unwrap();
        fs::write(root.join("projects/far.md"), "far away\n").unwrap();

        let store = NoteStore::open(NotesConfig::new(&root)).unwrap();
        let state = configure(ServerState::new(store, Arc::new(NotificationBus::new())));
        let server = NoteServer::new(state, ServerConfig::default());
        let bus = Arc::clone(&server.state().bus);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel();
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = stopped.await;
        }));

        TestServer {
            addr,
            bus,
            stop: Some(stop),
            handle,
            notes,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn root(&self) -> std::path::PathBuf {
        self.notes.path().join("notes")
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        timeout(Duration::from_secs(5), &mut self.handle)
            .await
            .expect("server did not shut down")
            .unwrap()
            .unwrap();
    }
}

#[tokio::test]
async fn test_health_and_pages() {
    let server = TestServer::start(|s| s).await;
    let client = reqwest::Client::new();

    let health: Value = client.get(server.url("/api/health")).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "ok");

    let home = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(home.status(), 200);
    let html = home.text().await.unwrap();
    assert!(html.contains(r#"<a href="/todo">todo</a>"#));
    assert!(html.contains(r#"<a href="/projects/roadmap">roadmap</a>"#));

    let missing = client.get(server.url("/nope")).send().await.unwrap();
    assert_eq!(missing.status(), 404);

    let escape = client.get(server.url("/api/get-note-raw?path=../../etc/passwd")).send().await.unwrap();
    assert_eq!(escape.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn test_graph_endpoints() {
    let server = TestServer::start(|s| s).await;
    let client = reqwest::Client::new();

    let graph: Value = client.get(server.url("/api/graph-data")).send().await.unwrap().json().await.unwrap();
    let nodes = graph["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    assert!(graph["edges"].as_array().unwrap().contains(&json!({"source": "homepage", "target": "todo"})));

    let local: Value = client
        .get(server.url("/api/local-graph?path=/todo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(local["current"], "todo");
    let ids: Vec<&str> = local["nodes"].as_array().unwrap().iter().map(|n| n["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&"homepage"));
    assert!(!ids.contains(&"far"));

    let missing_param = client.get(server.url("/api/local-graph")).send().await.unwrap();
    assert_eq!(missing_param.status(), 400);
    let unknown = client.get(server.url("/api/local-graph?path=ghost")).send().await.unwrap();
    assert_eq!(unknown.status(), 404);
    let body: Value = unknown.json().await.unwrap();
    assert_eq!(body, json!({"error": "Note not found"}));

    server.stop().await;
}

#[tokio::test]
async fn test_edit_endpoints() {
    let server = TestServer::start(|s| s).await;
    let client = reqwest::Client::new();

    let toggled = client
        .post(server.url("/api/toggle-checkbox"))
        .json(&json!({"note_path": "/todo", "checkbox_index": 1, "checked": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(toggled.status(), 200);
    assert_eq!(fs::read_to_string(server.root().join("todo.md")).unwrap(), "- [ ] one\n- [x] two\n");

    let out_of_range = client
        .post(server.url("/api/toggle-checkbox"))
        .json(&json!({"note_path": "todo", "checkbox_index": 7, "checked": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), 500);

    let saved = client
        .post(server.url("/api/save-note"))
        .json(&json!({"note_path": "todo", "content": "rewritten"}))
        .send()
        .await
        .unwrap();
    let saved: Value = saved.json().await.unwrap();
    assert_eq!(saved, json!({"success": true}));

    let raw: Value = client
        .get(server.url("/api/get-note-raw?path=todo"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(raw["content"], "rewritten");

    let incomplete = client
        .post(server.url("/api/save-note"))
        .json(&json!({"note_path": "todo"}))
        .send()
        .await
        .unwrap();
    assert_eq!(incomplete.status(), 400);

    server.stop().await;
}

/// Read the next chunk of an event stream as text.
async fn next_chunk(response: &mut reqwest::Response) -> String {
    let chunk = timeout(Duration::from_secs(5), response.chunk())
        .await
        .expect("no frame within 5s")
        .unwrap()
        .expect("stream ended");
    String::from_utf8(chunk.to_vec()).unwrap()
}

#[tokio::test]
async fn test_event_stream_receives_file_changes() {
    let server = TestServer::start(|s| s).await;
    let watcher = WatcherService::new(server.root(), Arc::clone(&server.bus)).unwrap();
    tokio::spawn(watcher.run());

    let mut events = reqwest::Client::new().get(server.url("/api/events")).send().await.unwrap();
    assert_eq!(events.headers()["content-type"], "text/event-stream");
    assert_eq!(next_chunk(&mut events).await, "event: connected\ndata: ok\n\n");

    tokio::time::sleep(Duration::from_millis(200)).await;
    fs::write(server.root().join("projects/far.md"), "closer now\n").unwrap();

    let frame = next_chunk(&mut events).await;
    assert!(frame.ends_with("data: /projects/far\n\n"), "unexpected frame {frame:?}");

    // shutdown ends the open stream instead of hanging on it
    server.stop().await;
}

struct ApiKeyOnly;

impl Authenticator for ApiKeyOnly {
    fn authenticate(&self, credentials: &Credentials) -> bool {
        credentials.api_key.as_deref() == Some("secret-key")
    }
}

#[tokio::test]
async fn test_authentication_guards_every_route() {
    let server = TestServer::start(|s| s.with_authenticator(Arc::new(ApiKeyOnly))).await;
    let client = reqwest::Client::new();

    for path in ["/", "/todo", "/api/graph-data", "/api/events", "/api/health"] {
        let response = client.get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 401, "{path}");
        assert_eq!(response.headers()["www-authenticate"], r#"Basic realm="Note Render""#);
    }

    let allowed = client
        .get(server.url("/api/graph-data"))
        .header("X-API-Key", "secret-key")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);

    server.stop().await;
}
