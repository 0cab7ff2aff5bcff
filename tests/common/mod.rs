//! In-process storage nodes and coordinator for integration tests

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use georeplica::coordinator::http::create_router;
use georeplica::{Coordinator, CoordinatorConfig, StorageNode};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// What a mock node received through `/replicate`
#[derive(Debug, Clone)]
pub struct StoredCopy {
    pub filename: String,
    pub data: Vec<u8>,
}

pub struct MockNodeState {
    status: StatusCode,
    delay: Duration,
    pub stored: Mutex<HashMap<String, StoredCopy>>,
    pub deleted: Mutex<Vec<String>>,
}

pub struct MockNode {
    pub addr: SocketAddr,
    pub state: Arc<MockNodeState>,
}

impl MockNode {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn descriptor(&self, id: &str, lat: f64, lon: f64) -> StorageNode {
        StorageNode::new(id, self.url(), lat, lon)
    }

    pub fn stored(&self, file_id: &str) -> Option<StoredCopy> {
        self.state.stored.lock().unwrap().get(file_id).cloned()
    }

    pub fn stored_count(&self) -> usize {
        self.state.stored.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.deleted.lock().unwrap().clone()
    }
}

async fn replicate(
    State(state): State<Arc<MockNodeState>>,
    mut multipart: Multipart,
) -> StatusCode {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    let mut id = None;
    let mut filename = None;
    let mut data = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("id") => id = field.text().await.ok(),
            Some("filename") => filename = field.text().await.ok(),
            Some("file") => data = field.bytes().await.ok().map(|b| b.to_vec()),
            _ => {}
        }
    }

    let (Some(id), Some(filename), Some(data)) = (id, filename, data) else {
        return StatusCode::BAD_REQUEST;
    };
    if state.status == StatusCode::CREATED {
        state
            .stored
            .lock()
            .unwrap()
            .insert(id, StoredCopy { filename, data });
    }
    state.status
}

async fn remove(State(state): State<Arc<MockNodeState>>, Path(id): Path<String>) -> StatusCode {
    state.deleted.lock().unwrap().push(id.clone());
    state.stored.lock().unwrap().remove(&id);
    if state.status == StatusCode::CREATED {
        StatusCode::OK
    } else {
        state.status
    }
}

async fn read(State(state): State<Arc<MockNodeState>>, Path(id): Path<String>) -> (StatusCode, Vec<u8>) {
    match state.stored.lock().unwrap().get(&id) {
        Some(copy) => (StatusCode::OK, copy.data.clone()),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

/// Start a storage node answering `/replicate` with `status`.
pub async fn spawn_node(status: StatusCode) -> MockNode {
    spawn_slow_node(status, Duration::ZERO).await
}

/// Like [`spawn_node`], but `/replicate` waits `delay` before answering.
pub async fn spawn_slow_node(status: StatusCode, delay: Duration) -> MockNode {
    let state = Arc::new(MockNodeState {
        status,
        delay,
        stored: Mutex::new(HashMap::new()),
        deleted: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/replicate", post(replicate))
        .route("/delete/:id", delete(remove))
        .route("/file/:id", get(read))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockNode { addr, state }
}

/// An address nothing listens on.
pub async fn dead_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn test_config(metadata_path: std::path::PathBuf) -> CoordinatorConfig {
    CoordinatorConfig {
        metadata_path,
        request_timeout_secs: 5,
        ..Default::default()
    }
}

/// Serve a coordinator on an ephemeral port. Returns its base URL.
pub async fn spawn_coordinator(coord: Arc<Coordinator>) -> String {
    let app = create_router(coord);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    format!("http://{}", addr)
}

pub fn upload_form(filename: &str, data: Vec<u8>) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(data).file_name(filename.to_string()),
    )
}
